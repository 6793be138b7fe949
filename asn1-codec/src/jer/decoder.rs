use asn1_core::model::{TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;
use serde_json::Value as Json;

use crate::error::{DecodeError, DecodeResult};
use crate::value::{BitStringValue, Value};

pub struct JerDecoder<'m> {
    model: &'m TypeModel,
}

impl<'m> JerDecoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn decode(&self, type_id: TypeId, bytes: &[u8], path: &str) -> DecodeResult<Value> {
        let json: Json = serde_json::from_slice(bytes).map_err(|e| DecodeError::new(path, 0, e.to_string()))?;
        from_json(self.model, type_id, &json, path)
    }
}

fn from_json(model: &TypeModel, id: TypeId, json: &Json, path: &str) -> DecodeResult<Value> {
    let node = model.node(id);
    match &node.kind {
        TypeKind::Boolean => json
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| DecodeError::new(path, 0, "expected a JSON boolean")),
        TypeKind::Integer => {
            if let Some(n) = json.as_i64() {
                Ok(Value::Integer(BigInt::from(n)))
            } else if let Some(s) = json.as_str() {
                s.parse::<BigInt>()
                    .map(Value::Integer)
                    .map_err(|e| DecodeError::new(path, 0, e.to_string()))
            } else {
                Err(DecodeError::new(path, 0, "expected a JSON integer or numeric string"))
            }
        }
        TypeKind::Enumerated(items) => {
            let name = json.as_str().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string"))?;
            if items.iter().any(|(n, _)| n == name) {
                Ok(Value::Enumerated(name.to_string()))
            } else {
                Err(DecodeError::new(path, 0, format!("no such ENUMERATED value `{name}`")))
            }
        }
        TypeKind::Real => json
            .as_f64()
            .map(Value::Real)
            .ok_or_else(|| DecodeError::new(path, 0, "expected a JSON number")),
        TypeKind::Null => {
            if json.is_null() {
                Ok(Value::Null)
            } else {
                Err(DecodeError::new(path, 0, "expected JSON null"))
            }
        }
        TypeKind::OctetString => {
            let s = json.as_str().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string"))?;
            hex_decode(s, path).map(Value::OctetString)
        }
        TypeKind::BitString => {
            let obj = json.as_object().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON object"))?;
            let s = obj
                .get("value")
                .and_then(Json::as_str)
                .ok_or_else(|| DecodeError::new(path, 0, "bit string object missing `value`"))?;
            let bit_len = obj
                .get("length")
                .and_then(Json::as_u64)
                .ok_or_else(|| DecodeError::new(path, 0, "bit string object missing `length`"))? as usize;
            let bytes = hex_decode(s, path)?;
            BitStringValue::new(bytes, bit_len)
                .map(Value::BitString)
                .map_err(|e| DecodeError::new(path, 0, e.message))
        }
        TypeKind::ObjectIdentifier => {
            let s = json.as_str().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string"))?;
            s.split('.')
                .map(|a| a.parse::<u64>().map_err(|e| DecodeError::new(path, 0, e.to_string())))
                .collect::<DecodeResult<Vec<_>>>()
                .map(Value::ObjectIdentifier)
        }
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
        | TypeKind::CharacterString => json
            .as_str()
            .map(|s| Value::CharacterString(s.to_string()))
            .ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string")),
        TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration => json
            .as_str()
            .map(|s| Value::TimeString(s.to_string()))
            .ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string")),
        TypeKind::Choice { alternatives, .. } => {
            let obj = json.as_object().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON object"))?;
            let (name, inner_json) = obj
                .iter()
                .next()
                .ok_or_else(|| DecodeError::new(path, 0, "empty CHOICE object"))?;
            let alt = alternatives
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| DecodeError::new(path, 0, format!("no such CHOICE alternative `{name}`")))?;
            let value = from_json(model, alt.ty, inner_json, &format!("{path}.{name}"))?;
            Ok(Value::Choice(name.clone(), Box::new(value)))
        }
        TypeKind::Sequence { components, .. } | TypeKind::Set { components, .. } => {
            let obj = json.as_object().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON object"))?;
            let mut fields = indexmap::IndexMap::new();
            for c in components {
                match obj.get(&c.name) {
                    Some(v) => {
                        fields.insert(c.name.clone(), from_json(model, c.ty, v, &format!("{path}.{}", c.name))?);
                    }
                    None if c.optional || c.has_default() => continue,
                    None => return Err(DecodeError::new(path, 0, format!("missing required component `{}`", c.name))),
                }
            }
            if matches!(node.kind, TypeKind::Set { .. }) {
                Ok(Value::Set(fields))
            } else {
                Ok(Value::Sequence(fields))
            }
        }
        TypeKind::SequenceOf(inner) | TypeKind::SetOf(inner) => {
            let arr = json.as_array().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON array"))?;
            let items = arr
                .iter()
                .enumerate()
                .map(|(i, v)| from_json(model, *inner, v, &format!("{path}[{i}]")))
                .collect::<DecodeResult<Vec<_>>>()?;
            if matches!(node.kind, TypeKind::SetOf(_)) {
                Ok(Value::SetOf(items))
            } else {
                Ok(Value::SequenceOf(items))
            }
        }
        TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType => {
            let s = json.as_str().ok_or_else(|| DecodeError::new(path, 0, "expected a JSON string"))?;
            hex_decode(s, path).map(Value::OpenType)
        }
        TypeKind::ObjectDescriptor | TypeKind::External | TypeKind::EmbeddedPdv | TypeKind::RelativeOid | TypeKind::Reference(_) => {
            Err(DecodeError::new(path, 0, "decoding this type in JER is not implemented"))
        }
    }
}

fn hex_decode(s: &str, path: &str) -> DecodeResult<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(DecodeError::new(path, 0, "odd-length hex string"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| DecodeError::new(path, 0, e.to_string())))
        .collect()
}
