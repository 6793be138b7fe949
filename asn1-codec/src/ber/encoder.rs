//! BER content encoding, dispatched over the resolved type model.
//!
//! Every call produces a complete tag-length-value encoding for one
//! node; tagging (plain/implicit/explicit) is handled once in
//! [`encode_node`] so the per-kind encoders only ever produce content
//! octets.

use asn1_core::model::{TagMode, TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::error::{EncodeError, EncodeResult};
use crate::value::{raw_default_as_value, Value};

use super::support::{class_of, encode_character_string, encode_oid_arcs, encode_relative_oid_arcs, is_self_tagged};
use super::types::{BerLength, BerTag};

pub struct BerEncoder<'m> {
    model: &'m TypeModel,
}

impl<'m> BerEncoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
        encode_node(self.model, type_id, value, path)
    }
}

pub fn encode_node(model: &TypeModel, id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
    let node = model.node(id);
    if is_self_tagged(node) {
        return encode_self_tagged(model, id, value, path);
    }
    let (constructed, content) = encode_content(model, &node.kind, value, path)?;
    let mut out = Vec::new();
    match node.tag.mode {
        TagMode::Implicit => {
            BerTag::new(class_of(node.tag.class), constructed, node.tag.number).encode(&mut out);
            BerLength::Definite(content.len()).encode(&mut out);
            out.extend(content);
        }
        TagMode::Explicit => {
            let mut inner = Vec::new();
            universal_tag_of(&node.kind, constructed).encode(&mut inner);
            BerLength::Definite(content.len()).encode(&mut inner);
            inner.extend(content);
            BerTag::new(class_of(node.tag.class), true, node.tag.number).encode(&mut out);
            BerLength::Definite(inner.len()).encode(&mut out);
            out.extend(inner);
        }
    }
    Ok(out)
}

fn encode_self_tagged(model: &TypeModel, id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
    let node = model.node(id);
    match (&node.kind, value) {
        (TypeKind::Choice { alternatives, .. }, Value::Choice(name, inner)) => {
            let alt = alternatives
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such CHOICE alternative `{name}`")))?;
            encode_node(model, alt.ty, inner, &format!("{path}.{name}"))
        }
        (TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType, Value::OpenType(bytes)) => {
            Ok(bytes.clone())
        }
        _ => Err(EncodeError::new(path, "value shape does not match an untagged CHOICE/ANY type")),
    }
}

fn universal_tag_of(kind: &TypeKind, constructed: bool) -> BerTag {
    use super::types::BerTagClass;
    let number = match kind {
        TypeKind::Boolean => 1,
        TypeKind::Integer => 2,
        TypeKind::Enumerated(_) => 10,
        TypeKind::BitString => 3,
        TypeKind::OctetString => 4,
        TypeKind::Null => 5,
        TypeKind::ObjectIdentifier => 6,
        TypeKind::ObjectDescriptor => 7,
        TypeKind::External => 8,
        TypeKind::Real => 9,
        TypeKind::EmbeddedPdv => 11,
        TypeKind::Utf8String => 12,
        TypeKind::RelativeOid => 13,
        TypeKind::Sequence { .. } => 16,
        TypeKind::Set { .. } => 17,
        TypeKind::SequenceOf(_) => 16,
        TypeKind::SetOf(_) => 17,
        TypeKind::NumericString => 18,
        TypeKind::PrintableString => 19,
        TypeKind::TeletexString => 20,
        TypeKind::Ia5String => 22,
        TypeKind::UtcTime => 23,
        TypeKind::GeneralizedTime => 24,
        TypeKind::GraphicString => 25,
        TypeKind::VisibleString => 26,
        TypeKind::GeneralString => 27,
        TypeKind::UniversalString => 28,
        TypeKind::CharacterString => 29,
        TypeKind::BmpString => 30,
        TypeKind::Date => 31,
        TypeKind::TimeOfDay => 32,
        TypeKind::DateTime => 33,
        TypeKind::Duration => 34,
        TypeKind::Choice { .. } | TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType | TypeKind::Reference(_) => 0,
    };
    BerTag::new(BerTagClass::Universal, constructed, number)
}

fn encode_content(
    model: &TypeModel,
    kind: &TypeKind,
    value: &Value,
    path: &str,
) -> EncodeResult<(bool, Vec<u8>)> {
    match (kind, value) {
        (TypeKind::Boolean, Value::Boolean(b)) => Ok((false, vec![if *b { 0xFF } else { 0x00 }])),
        (TypeKind::Integer, Value::Integer(n)) => Ok((false, two_s_complement_bytes(n))),
        (TypeKind::Enumerated(items), Value::Enumerated(name)) => {
            let (_, v) = items
                .iter()
                .find(|(n, _)| n == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such ENUMERATED value `{name}`")))?;
            Ok((false, two_s_complement_bytes(&BigInt::from(*v))))
        }
        (TypeKind::Real, Value::Real(r)) => Ok((false, encode_real(*r))),
        (TypeKind::Null, Value::Null) => Ok((false, Vec::new())),
        (TypeKind::BitString, Value::BitString(bits)) => {
            let total_bits = bits.bytes().len() * 8;
            let unused = (total_bits - bits.bit_len()).min(7);
            let mut content = vec![unused as u8];
            content.extend_from_slice(bits.bytes());
            Ok((false, content))
        }
        (TypeKind::OctetString, Value::OctetString(bytes)) => Ok((false, bytes.clone())),
        (TypeKind::ObjectIdentifier, Value::ObjectIdentifier(arcs)) => {
            let mut content = Vec::new();
            encode_oid_arcs(arcs, &mut content)?;
            Ok((false, content))
        }
        (TypeKind::RelativeOid, Value::RelativeOid(arcs)) => {
            let mut content = Vec::new();
            encode_relative_oid_arcs(arcs, &mut content);
            Ok((false, content))
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
        ) => Ok((false, encode_character_string(kind, s))),
        (
            TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration,
            Value::TimeString(s),
        ) => Ok((false, s.as_bytes().to_vec())),
        (TypeKind::Sequence { components, .. }, Value::Sequence(fields))
        | (TypeKind::Set { components, .. }, Value::Set(fields)) => {
            let mut content = Vec::new();
            for c in components {
                match fields.get(&c.name) {
                    Some(v) if c.default.as_ref().and_then(raw_default_as_value).as_ref() == Some(v) => continue,
                    Some(v) => content.extend(encode_node(model, c.ty, v, &format!("{path}.{}", c.name))?),
                    None if c.optional || c.has_default() => continue,
                    None => {
                        return Err(EncodeError::new(
                            path,
                            format!("missing required component `{}`", c.name),
                        ))
                    }
                }
            }
            Ok((true, content))
        }
        (TypeKind::SequenceOf(inner), Value::SequenceOf(items)) => {
            let mut content = Vec::new();
            for (i, item) in items.iter().enumerate() {
                content.extend(encode_node(model, *inner, item, &format!("{path}[{i}]"))?);
            }
            Ok((true, content))
        }
        (TypeKind::SetOf(inner), Value::SetOf(items)) => {
            // DER clause 11.6: SET OF elements are ordered by their own
            // encoding, ascending lexicographically by octet.
            let mut encoded: Vec<Vec<u8>> = items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_node(model, *inner, item, &format!("{path}[{i}]")))
                .collect::<EncodeResult<_>>()?;
            encoded.sort();
            Ok((true, encoded.concat()))
        }
        _ => Err(EncodeError::new(path, "value shape does not match declared type")),
    }
}

/// X.690 clause 8.3: minimal-length two's-complement big-endian bytes.
pub(crate) fn two_s_complement_bytes(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return vec![0];
    }
    let (sign, mut bytes) = n.to_bytes_be();
    if sign == num_bigint::Sign::Minus {
        return encode_negative(n);
    }
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    bytes
}

fn encode_negative(n: &BigInt) -> Vec<u8> {
    let bit_len = n.abs().bits() as u32;
    let byte_len = (bit_len / 8 + 1).max(1) as usize;
    let modulus = BigInt::from(1u8) << (byte_len * 8);
    let twos = n + modulus;
    let (_, mut bytes) = twos.to_bytes_be();
    while bytes.len() < byte_len {
        bytes.insert(0, 0xFF);
    }
    if bytes[0] & 0x80 == 0 {
        bytes.insert(0, 0xFF);
    }
    bytes
}

/// A minimal binary REAL encoding (X.690 clause 8.5): base 2, no scale
/// factor, the shortest mantissa that exactly represents the value.
/// Encoding of non-finite or non-representable values is not attempted.
fn encode_real(r: f64) -> Vec<u8> {
    if r == 0.0 {
        return Vec::new();
    }
    let bits = r.to_bits();
    let sign = (bits >> 63) & 1;
    let exponent = ((bits >> 52) & 0x7FF) as i64 - 1075;
    let mantissa = (bits & 0xFFFFFFFFFFFFF) | 0x10000000000000;
    let trailing = mantissa.trailing_zeros().min(52);
    let mantissa = mantissa >> trailing;
    let exponent = exponent + trailing as i64;
    let mut first = 0x80u8;
    if sign == 1 {
        first |= 0x40;
    }
    let mantissa_bytes = mantissa.to_be_bytes();
    let start = mantissa_bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let mut content = vec![first];
    let exp_bytes = (exponent as i16).to_be_bytes();
    content.extend_from_slice(&exp_bytes);
    content.extend_from_slice(&mantissa_bytes[start..]);
    content
}
