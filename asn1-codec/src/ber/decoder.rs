//! BER decoding, the mirror image of [`super::encoder`]: walk the type
//! model and the byte stream together, producing a [`Value`] tree.

use asn1_core::model::{TagMode, TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;

use crate::error::{DecodeError, DecodeResult};
use crate::value::{BitStringValue, Value};

use super::support::{
    candidate_tags, class_of, decode_character_string, decode_oid_arcs, decode_relative_oid_arcs, is_self_tagged,
    tag_matches,
};
use super::types::{BerLength, BerTag};

pub struct BerDecoder<'m> {
    model: &'m TypeModel,
}

impl<'m> BerDecoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    /// Decodes one value and confirms the whole buffer was consumed —
    /// the facade's `decode` is one-shot, not a stream reader.
    pub fn decode(&self, type_id: TypeId, buf: &[u8], path: &str) -> DecodeResult<Value> {
        let mut pos = 0;
        let value = decode_node(self.model, type_id, buf, &mut pos, path)?;
        if pos != buf.len() {
            return Err(DecodeError::new(path, pos, "trailing bytes after decoded value"));
        }
        Ok(value)
    }
}

pub fn decode_node(model: &TypeModel, id: TypeId, buf: &[u8], pos: &mut usize, path: &str) -> DecodeResult<Value> {
    let node = model.node(id);
    if is_self_tagged(node) {
        return decode_self_tagged(model, id, buf, pos, path);
    }
    let tag = BerTag::decode(buf, pos, path)?;
    let expected_class = class_of(node.tag.class);
    if tag.class != expected_class || tag.number != node.tag.number {
        return Err(DecodeError::new(
            path,
            *pos,
            format!("tag mismatch: expected class {:?} number {}, got class {:?} number {}", expected_class, node.tag.number, tag.class, tag.number),
        ));
    }
    let content = read_content(buf, pos, path)?;
    match node.tag.mode {
        TagMode::Implicit => decode_content(model, &node.kind, &content, path),
        TagMode::Explicit => {
            let mut inner_pos = 0;
            let _inner_tag = BerTag::decode(&content, &mut inner_pos, path)?;
            let inner_content = read_content(&content, &mut inner_pos, path)?;
            decode_content(model, &node.kind, &inner_content, path)
        }
    }
}

/// Reads the length octets at `*pos` and returns the content octets they
/// frame, advancing `*pos` past them. BER constructed values may use the
/// indefinite form (length `0x80`), terminated by an end-of-contents
/// marker (tag `0x00`, length `0x00`) rather than a byte count; this walks
/// nested TLVs structurally to find it, since content can itself contain
/// `00 00` as ordinary data. DER forbids indefinite length, but that is
/// enforced by [`super::der::DerDecoder`]'s re-encode-and-compare check,
/// not here — the plain BER decoder accepts it per X.690.
fn read_content(buf: &[u8], pos: &mut usize, path: &str) -> DecodeResult<Vec<u8>> {
    match BerLength::decode(buf, pos, path)? {
        BerLength::Definite(n) => {
            let content = buf
                .get(*pos..*pos + n)
                .ok_or_else(|| DecodeError::new(path, *pos, "truncated content"))?
                .to_vec();
            *pos += n;
            Ok(content)
        }
        BerLength::Indefinite => read_indefinite_content(buf, pos, path),
    }
}

/// Consumes TLVs from `*pos` until the end-of-contents octets `00 00`,
/// returning everything before them (and leaving `*pos` just past them).
fn read_indefinite_content(buf: &[u8], pos: &mut usize, path: &str) -> DecodeResult<Vec<u8>> {
    let start = *pos;
    loop {
        if buf.get(*pos..*pos + 2) == Some(&[0x00, 0x00]) {
            let content = buf[start..*pos].to_vec();
            *pos += 2;
            return Ok(content);
        }
        if *pos >= buf.len() {
            return Err(DecodeError::new(path, *pos, "missing end-of-contents octets for indefinite-length value"));
        }
        skip_tlv(buf, pos, path)?;
    }
}

/// Skips one complete TLV at `*pos`, recursing into nested indefinite
/// lengths so [`read_indefinite_content`] never mistakes data bytes for
/// an end-of-contents marker.
fn skip_tlv(buf: &[u8], pos: &mut usize, path: &str) -> DecodeResult<()> {
    BerTag::decode(buf, pos, path)?;
    match BerLength::decode(buf, pos, path)? {
        BerLength::Definite(n) => {
            let end = pos
                .checked_add(n)
                .filter(|&end| end <= buf.len())
                .ok_or_else(|| DecodeError::new(path, *pos, "truncated content"))?;
            *pos = end;
        }
        BerLength::Indefinite => {
            read_indefinite_content(buf, pos, path)?;
        }
    }
    Ok(())
}

fn decode_self_tagged(model: &TypeModel, id: TypeId, buf: &[u8], pos: &mut usize, path: &str) -> DecodeResult<Value> {
    let node = model.node(id);
    match &node.kind {
        TypeKind::Choice { alternatives, .. } => {
            let mut probe = *pos;
            let seen = BerTag::decode(buf, &mut probe, path)?;
            for alt in alternatives {
                if tag_matches(&candidate_tags(model, alt.ty), seen) {
                    let value = decode_node(model, alt.ty, buf, pos, &format!("{path}.{}", alt.name))?;
                    return Ok(Value::Choice(alt.name.clone(), Box::new(value)));
                }
            }
            Err(DecodeError::new(path, *pos, "no CHOICE alternative matches the encoded tag"))
        }
        TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType => {
            let tlv_start = *pos;
            let mut scan = *pos;
            BerTag::decode(buf, &mut scan, path)?;
            let end = match BerLength::decode(buf, &mut scan, path)? {
                BerLength::Definite(n) => scan
                    .checked_add(n)
                    .filter(|&end| end <= buf.len())
                    .ok_or_else(|| DecodeError::new(path, *pos, "truncated open-type value"))?,
                BerLength::Indefinite => {
                    read_indefinite_content(buf, &mut scan, path)?;
                    scan
                }
            };
            let bytes = buf
                .get(tlv_start..end)
                .ok_or_else(|| DecodeError::new(path, *pos, "truncated open-type value"))?
                .to_vec();
            *pos = end;
            Ok(Value::OpenType(bytes))
        }
        _ => Err(DecodeError::new(path, *pos, "untagged type is neither CHOICE nor an open type")),
    }
}

fn decode_content(model: &TypeModel, kind: &TypeKind, content: &[u8], path: &str) -> DecodeResult<Value> {
    match kind {
        TypeKind::Boolean => Ok(Value::Boolean(content.first().copied().unwrap_or(0) != 0)),
        TypeKind::Integer => Ok(Value::Integer(decode_integer(content, path)?)),
        TypeKind::Enumerated(items) => {
            let n = decode_integer(content, path)?;
            let value: i128 = n
                .try_into()
                .map_err(|_| DecodeError::new(path, 0, "ENUMERATED value out of range"))?;
            let name = items
                .iter()
                .find(|(_, v)| *v == value)
                .map(|(n, _)| n.clone())
                .ok_or_else(|| DecodeError::new(path, 0, format!("no ENUMERATED name for value {value}")))?;
            Ok(Value::Enumerated(name))
        }
        TypeKind::Real => Ok(Value::Real(decode_real(content, path)?)),
        TypeKind::Null => {
            if !content.is_empty() {
                return Err(DecodeError::new(path, 0, "NULL must have empty content"));
            }
            Ok(Value::Null)
        }
        TypeKind::BitString => {
            let unused = *content
                .first()
                .ok_or_else(|| DecodeError::new(path, 0, "empty BIT STRING content"))? as usize;
            let bytes = content[1..].to_vec();
            let bit_len = bytes.len() * 8 - unused.min(bytes.len() * 8);
            let bits = BitStringValue::new(bytes, bit_len).map_err(|e| DecodeError::new(path, 0, e.message))?;
            Ok(Value::BitString(bits))
        }
        TypeKind::OctetString => Ok(Value::OctetString(content.to_vec())),
        TypeKind::ObjectIdentifier => Ok(Value::ObjectIdentifier(decode_oid_arcs(content, path)?)),
        TypeKind::RelativeOid => Ok(Value::RelativeOid(decode_relative_oid_arcs(content, path)?)),
        TypeKind::Utf8String
        | TypeKind::Ia5String
        | TypeKind::PrintableString
        | TypeKind::NumericString
        | TypeKind::VisibleString
        | TypeKind::GeneralString
        | TypeKind::BmpString
        | TypeKind::UniversalString
        | TypeKind::TeletexString
        | TypeKind::GraphicString
        | TypeKind::CharacterString => Ok(Value::CharacterString(decode_character_string(kind, content, path)?)),
        TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration => {
            let s = std::str::from_utf8(content).map_err(|e| DecodeError::new(path, 0, e.to_string()))?;
            Ok(Value::TimeString(s.to_string()))
        }
        TypeKind::Sequence { components, .. } | TypeKind::Set { components, .. } => {
            let mut fields = indexmap::IndexMap::new();
            let mut sub_pos = 0;
            for c in components {
                if sub_pos >= content.len() {
                    if c.optional || c.has_default() {
                        continue;
                    }
                    return Err(DecodeError::new(path, sub_pos, format!("missing required component `{}`", c.name)));
                }
                let mut probe = sub_pos;
                let seen = BerTag::decode(content, &mut probe, path)?;
                if !tag_matches(&candidate_tags(model, c.ty), seen) {
                    if c.optional || c.has_default() {
                        continue;
                    }
                    return Err(DecodeError::new(path, sub_pos, format!("component `{}` does not match the encoded tag", c.name)));
                }
                let value = decode_node(model, c.ty, content, &mut sub_pos, &format!("{path}.{}", c.name))?;
                fields.insert(c.name.clone(), value);
            }
            if matches!(kind, TypeKind::Set { .. }) {
                Ok(Value::Set(fields))
            } else {
                Ok(Value::Sequence(fields))
            }
        }
        TypeKind::SequenceOf(inner) | TypeKind::SetOf(inner) => {
            let mut items = Vec::new();
            let mut sub_pos = 0;
            let mut i = 0;
            while sub_pos < content.len() {
                items.push(decode_node(model, *inner, content, &mut sub_pos, &format!("{path}[{i}]"))?);
                i += 1;
            }
            if matches!(kind, TypeKind::SetOf(_)) {
                Ok(Value::SetOf(items))
            } else {
                Ok(Value::SequenceOf(items))
            }
        }
        TypeKind::Choice { .. } | TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType | TypeKind::Reference(_) => {
            Err(DecodeError::new(path, 0, "type requires its own tag handling and cannot appear as plain content"))
        }
        TypeKind::ObjectDescriptor | TypeKind::External | TypeKind::EmbeddedPdv => Err(DecodeError::new(
            path,
            0,
            "decoding this universal type is not implemented",
        )),
    }
}

fn decode_integer(content: &[u8], path: &str) -> DecodeResult<BigInt> {
    if content.is_empty() {
        return Err(DecodeError::new(path, 0, "empty INTEGER content"));
    }
    Ok(BigInt::from_signed_bytes_be(content))
}

fn decode_real(content: &[u8], path: &str) -> DecodeResult<f64> {
    if content.is_empty() {
        return Ok(0.0);
    }
    let first = content[0];
    if first & 0x80 == 0 {
        return Err(DecodeError::new(path, 0, "only binary-encoded REAL is supported"));
    }
    let sign = if first & 0x40 != 0 { -1.0 } else { 1.0 };
    if first & 0x3F != 0 {
        return Err(DecodeError::new(path, 0, "only base-2, unscaled REAL is supported"));
    }
    let exponent = i16::from_be_bytes([content[1], content[2]]) as i64;
    let mantissa_bytes = &content[3..];
    let mut mantissa: u64 = 0;
    for b in mantissa_bytes {
        mantissa = (mantissa << 8) | *b as u64;
    }
    Ok(sign * mantissa as f64 * 2f64.powi(exponent as i32))
}
