//! Generic String Encoding Rules (RFC 3641): a human-readable textual
//! form close to ASN.1 value notation. Encode-only — GSER is meant for
//! display and logging, not for round-tripping, so decoding raises
//! [`crate::error::Unsupported`].

use asn1_core::model::{TypeId, TypeKind, TypeModel};

use crate::error::{EncodeError, EncodeResult, Unsupported};
use crate::value::{raw_default_as_value, Value};

pub struct GserEncoder<'m> {
    model: &'m TypeModel,
}

impl<'m> GserEncoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, path: &str) -> EncodeResult<String> {
        render(self.model, type_id, value, path)
    }
}

pub fn decode(_bytes: &[u8]) -> Result<Value, Unsupported> {
    Err(Unsupported("GSER decoding is not implemented; GSER is a display format".to_string()))
}

fn render(model: &TypeModel, id: TypeId, value: &Value, path: &str) -> EncodeResult<String> {
    let node = model.node(id);
    match (&node.kind, value) {
        (TypeKind::Boolean, Value::Boolean(b)) => Ok(if *b { "TRUE".to_string() } else { "FALSE".to_string() }),
        (TypeKind::Integer, Value::Integer(n)) => Ok(n.to_string()),
        (TypeKind::Enumerated(_), Value::Enumerated(name)) => Ok(name.clone()),
        (TypeKind::Real, Value::Real(r)) => Ok(r.to_string()),
        (TypeKind::Null, Value::Null) => Ok("NULL".to_string()),
        (TypeKind::OctetString, Value::OctetString(bytes)) => {
            Ok(format!("'{}'H", bytes.iter().map(|b| format!("{b:02X}")).collect::<String>()))
        }
        (TypeKind::BitString, Value::BitString(bits)) => Ok(format!(
            "'{}'B",
            (0..bits.bit_len()).map(|i| if bits.get(i).unwrap_or(false) { '1' } else { '0' }).collect::<String>()
        )),
        (TypeKind::ObjectIdentifier, Value::ObjectIdentifier(arcs)) => {
            Ok(format!("{{{}}}", arcs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ")))
        }
        (
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
            | TypeKind::CharacterString,
            Value::CharacterString(s),
        ) => Ok(format!("\"{}\"", s.replace('"', "\"\""))),
        (
            TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration,
            Value::TimeString(s),
        ) => Ok(format!("\"{s}\"")),
        (TypeKind::Choice { alternatives, .. }, Value::Choice(name, inner)) => {
            let alt = alternatives
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such CHOICE alternative `{name}`")))?;
            Ok(format!("{name} {}", render(model, alt.ty, inner, &format!("{path}.{name}"))?))
        }
        (TypeKind::Sequence { components, .. }, Value::Sequence(fields))
        | (TypeKind::Set { components, .. }, Value::Set(fields)) => {
            let mut parts = Vec::new();
            for c in components {
                match fields.get(&c.name) {
                    Some(v) if c.default.as_ref().and_then(raw_default_as_value).as_ref() == Some(v) => continue,
                    Some(v) => parts.push(format!("{} {}", c.name, render(model, c.ty, v, &format!("{path}.{}", c.name))?)),
                    None if c.optional || c.has_default() => continue,
                    None => return Err(EncodeError::new(path, format!("missing required component `{}`", c.name))),
                }
            }
            Ok(format!("{{ {} }}", parts.join(", ")))
        }
        (TypeKind::SequenceOf(inner), Value::SequenceOf(items)) | (TypeKind::SetOf(inner), Value::SetOf(items)) => {
            let parts = items
                .iter()
                .enumerate()
                .map(|(i, item)| render(model, *inner, item, &format!("{path}[{i}]")))
                .collect::<EncodeResult<Vec<_>>>()?;
            Ok(format!("{{ {} }}", parts.join(", ")))
        }
        (TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType, Value::OpenType(bytes)) => {
            Ok(format!("'{}'H", bytes.iter().map(|b| format!("{b:02X}")).collect::<String>()))
        }
        _ => Err(EncodeError::new(path, "value shape does not match declared type")),
    }
}
