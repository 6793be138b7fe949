//! A compiled type model paired with a codec: the thing a caller
//! actually encodes and decodes values against.

use asn1_core::ast::RawModule;
use asn1_core::model::TypeModel;
use asn1_codec::value::Value;
use asn1_codec::Codec;

use crate::error::{Error, Result};
use crate::schema;

/// One input to [`compile`]/[`parse`]: raw module text, an
/// already-parsed module list, or a previously persisted
/// [`CompiledSpec`] blob.
#[derive(Debug, Clone)]
pub enum Source {
    Text(String),
    Parsed(Vec<RawModule>),
    Blob(Vec<u8>),
}

/// Parses every [`Source::Text`]/[`Source::Parsed`] entry into the raw
/// module list `compile` would otherwise build and discard internally —
/// the pre-parsed, serializable "dict" form of the library surface.
/// `Source::Blob` entries are rejected: a persisted spec is already
/// resolved, one step past what `parse` returns.
pub fn parse(sources: &[Source]) -> Result<Vec<RawModule>> {
    let mut modules = Vec::new();
    for (i, source) in sources.iter().enumerate() {
        match source {
            Source::Text(text) => {
                let file = format!("<source {i}>");
                let parsed = asn1_core::parse_modules(text, &file).map_err(|e| match e {
                    asn1_core::parser::ModuleParseError::Lex(e) => asn1_core::error::CompileError::Lex(e),
                    asn1_core::parser::ModuleParseError::Parse(e) => asn1_core::error::CompileError::Parse(e),
                })?;
                modules.extend(parsed);
            }
            Source::Parsed(parsed) => modules.extend(parsed.clone()),
            Source::Blob(_) => {
                return Err(Error::Schema(
                    "parse() does not accept a persisted spec blob; pass it to compile() directly".to_string(),
                ));
            }
        }
    }
    Ok(modules)
}

/// Parses and resolves every source into one [`TypeModel`], then pairs
/// it with `codec`. A single [`Source::Blob`] is accepted on its own
/// (a model already compiled earlier, recompiled against a possibly
/// different codec — the "convert" use case); mixing a blob with text
/// or pre-parsed sources is rejected as ambiguous.
pub fn compile(sources: &[Source], codec: Codec) -> Result<CompiledSpec> {
    if sources.iter().any(|s| matches!(s, Source::Blob(_))) {
        if sources.len() != 1 {
            return Err(Error::Schema(
                "a persisted spec blob cannot be combined with other sources".to_string(),
            ));
        }
        let Source::Blob(bytes) = &sources[0] else { unreachable!() };
        let persisted = CompiledSpec::from_bytes(bytes)?;
        return Ok(CompiledSpec::new(persisted.into_model(), codec));
    }
    let modules = parse(sources)?;
    let model = asn1_core::compile_modules(modules)?;
    Ok(CompiledSpec::new(model, codec))
}

/// The `bytes|string` result `CompiledSpec::encode` produces: binary
/// wire formats return [`Encoded::Bytes`], the three text formats return
/// [`Encoded::Text`] holding already-validated UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Bytes(Vec<u8>),
    Text(String),
}

impl Encoded {
    /// The encoded form as bytes regardless of variant (a `Text`'s
    /// UTF-8 bytes, or a `Bytes`' own contents) — the common case when a
    /// caller just wants to write the result somewhere.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Encoded::Bytes(b) => b,
            Encoded::Text(s) => s.as_bytes(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Encoded::Bytes(b) => b,
            Encoded::Text(s) => s.into_bytes(),
        }
    }

    /// `Some` only for [`Encoded::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Encoded::Text(s) => Some(s),
            Encoded::Bytes(_) => None,
        }
    }
}

/// A resolved type model plus the codec `encode`/`decode` calls run
/// through. Cheap to clone: [`TypeModel`] is itself an `Arc` pair.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    model: TypeModel,
    codec: Codec,
}

impl CompiledSpec {
    pub fn new(model: TypeModel, codec: Codec) -> Self {
        Self { model, codec }
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    fn into_model(self) -> TypeModel {
        self.model
    }

    /// Looks up `type_name` in the compiled module set and encodes
    /// `value` against it with the spec's codec. XER/JER/GSER return
    /// [`Encoded::Text`]; every other codec returns [`Encoded::Bytes`].
    pub fn encode(&self, type_name: &str, value: &Value) -> Result<Encoded> {
        let id = self.model.lookup(type_name).ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        let bytes = self.codec.encode(&self.model, id, value, type_name)?;
        Ok(match self.codec {
            Codec::Xer | Codec::Jer | Codec::Gser => {
                Encoded::Text(String::from_utf8(bytes).map_err(|e| Error::Schema(e.to_string()))?)
            }
            Codec::Ber | Codec::Der | Codec::Per | Codec::Uper => Encoded::Bytes(bytes),
        })
    }

    /// Looks up `type_name` and decodes `bytes` against it with the
    /// spec's codec. Trailing bytes after the decoded value are an
    /// error (see each codec's decoder for the exact wording). For a
    /// text codec (XER/JER/GSER), pass the text's UTF-8 bytes — GSER
    /// always fails here, being encode-only.
    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<Value> {
        let id = self.model.lookup(type_name).ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        Ok(self.codec.decode(&self.model, id, bytes, type_name)?)
    }

    /// Serializes this compiled spec (model + codec choice) to the
    /// binary schema in [`crate::schema`]. The first byte is the codec
    /// tag; the rest is `schema::write_model`'s output.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![codec_tag(self.codec)];
        schema::write_model(&mut out, &self.model);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes.split_first().ok_or_else(|| Error::Schema("empty spec blob".to_string()))?;
        let codec = codec_from_tag(tag)?;
        let model = schema::read_model(rest)?;
        Ok(Self::new(model, codec))
    }
}

fn codec_tag(codec: Codec) -> u8 {
    match codec {
        Codec::Ber => 0,
        Codec::Der => 1,
        Codec::Per => 2,
        Codec::Uper => 3,
        Codec::Xer => 4,
        Codec::Jer => 5,
        Codec::Gser => 6,
    }
}

fn codec_from_tag(tag: u8) -> Result<Codec> {
    Ok(match tag {
        0 => Codec::Ber,
        1 => Codec::Der,
        2 => Codec::Per,
        3 => Codec::Uper,
        4 => Codec::Xer,
        5 => Codec::Jer,
        6 => Codec::Gser,
        n => return Err(Error::Schema(format!("unknown persisted codec tag {n}"))),
    })
}

/// Maps the external `codec ∈ {ber, der, per, uper, xer, jer, gser}`
/// names onto [`Codec`], case-insensitively.
pub fn codec_from_name(name: &str) -> Result<Codec> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "ber" => Codec::Ber,
        "der" => Codec::Der,
        "per" => Codec::Per,
        "uper" => Codec::Uper,
        "xer" => Codec::Xer,
        "jer" => Codec::Jer,
        "gser" => Codec::Gser,
        _ => return Err(Error::UnknownCodec(name.to_string())),
    })
}
