use asn1_core::model::{TypeId, TypeKind, TypeModel};
use num_traits::ToPrimitive;
use serde_json::{Map, Number, Value as Json};

use crate::error::{EncodeError, EncodeResult};
use crate::value::{raw_default_as_value, Value};

/// JSON/JS's largest integer representable without precision loss
/// (2^53); JER numbers outside this range fall back to a string.
const SAFE_INTEGER: i128 = 9_007_199_254_740_992;

pub struct JerEncoder<'m> {
    model: &'m TypeModel,
}

impl<'m> JerEncoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
        let json = to_json(self.model, type_id, value, path)?;
        serde_json::to_vec(&json).map_err(|e| EncodeError::new(path, e.to_string()))
    }
}

fn to_json(model: &TypeModel, id: TypeId, value: &Value, path: &str) -> EncodeResult<Json> {
    let node = model.node(id);
    match (&node.kind, value) {
        (TypeKind::Boolean, Value::Boolean(b)) => Ok(Json::Bool(*b)),
        (TypeKind::Integer, Value::Integer(n)) => Ok(match n.to_i128() {
            Some(i) if (-SAFE_INTEGER..=SAFE_INTEGER).contains(&i) => Number::from_i128(i)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(n.to_string())),
            _ => Json::String(n.to_string()),
        }),
        (TypeKind::Enumerated(_), Value::Enumerated(name)) => Ok(Json::String(name.clone())),
        (TypeKind::Real, Value::Real(r)) => {
            Ok(Number::from_f64(*r).map(Json::Number).unwrap_or(Json::String(r.to_string())))
        }
        (TypeKind::Null, Value::Null) => Ok(Json::Null),
        (TypeKind::OctetString, Value::OctetString(bytes)) => {
            Ok(Json::String(bytes.iter().map(|b| format!("{b:02X}")).collect()))
        }
        (TypeKind::BitString, Value::BitString(bits)) => {
            let mut obj = Map::new();
            obj.insert("value".to_string(), Json::String(bits.bytes().iter().map(|b| format!("{b:02X}")).collect()));
            obj.insert("length".to_string(), Json::Number(Number::from(bits.bit_len())));
            Ok(Json::Object(obj))
        }
        (TypeKind::ObjectIdentifier, Value::ObjectIdentifier(arcs)) => {
            Ok(Json::String(arcs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(".")))
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
        ) => Ok(Json::String(s.clone())),
        (
            TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration,
            Value::TimeString(s),
        ) => Ok(Json::String(s.clone())),
        (TypeKind::Choice { alternatives, .. }, Value::Choice(name, inner)) => {
            let alt = alternatives
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such CHOICE alternative `{name}`")))?;
            let mut map = Map::new();
            map.insert(name.clone(), to_json(model, alt.ty, inner, &format!("{path}.{name}"))?);
            Ok(Json::Object(map))
        }
        (TypeKind::Sequence { components, .. }, Value::Sequence(fields))
        | (TypeKind::Set { components, .. }, Value::Set(fields)) => {
            let mut map = Map::new();
            for c in components {
                match fields.get(&c.name) {
                    Some(v) if c.default.as_ref().and_then(raw_default_as_value).as_ref() == Some(v) => continue,
                    Some(v) => {
                        map.insert(c.name.clone(), to_json(model, c.ty, v, &format!("{path}.{}", c.name))?);
                    }
                    None if c.optional || c.has_default() => continue,
                    None => return Err(EncodeError::new(path, format!("missing required component `{}`", c.name))),
                }
            }
            Ok(Json::Object(map))
        }
        (TypeKind::SequenceOf(inner), Value::SequenceOf(items)) | (TypeKind::SetOf(inner), Value::SetOf(items)) => {
            let arr = items
                .iter()
                .enumerate()
                .map(|(i, item)| to_json(model, *inner, item, &format!("{path}[{i}]")))
                .collect::<EncodeResult<Vec<_>>>()?;
            Ok(Json::Array(arr))
        }
        (TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType, Value::OpenType(bytes)) => {
            Ok(Json::String(bytes.iter().map(|b| format!("{b:02X}")).collect()))
        }
        _ => Err(EncodeError::new(path, "value shape does not match declared type")),
    }
}
