//! The canonical runtime value representation (§6): one enum shared by
//! every codec so a value built once can be fed to any of them.

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::error::{EncodeError, EncodeResult};

/// A bit string value: bytes plus the number of significant bits, MSB
/// first within each byte — trailing bits in the final byte beyond
/// `bit_len` are insignificant padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStringValue {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitStringValue {
    pub fn new(bytes: Vec<u8>, bit_len: usize) -> EncodeResult<Self> {
        if bit_len > bytes.len() * 8 {
            return Err(EncodeError::new(
                "",
                format!(
                    "bit string has {} bits but only {} bytes were given",
                    bit_len,
                    bytes.len()
                ),
            ));
        }
        Ok(Self { bytes, bit_len })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        let byte = self.bytes[index / 8];
        Some((byte >> (7 - index % 8)) & 1 == 1)
    }
}

/// The implementer-defined canonical value form required by §6: booleans
/// are booleans, INTEGER is arbitrary precision, OCTET-STRING is raw
/// bytes, CHOICE is (alternative, value), SEQUENCE/SET are keyed records
/// with absent optionals simply not present in the map.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(BigInt),
    Real(f64),
    Null,
    BitString(BitStringValue),
    OctetString(Vec<u8>),
    ObjectIdentifier(Vec<u64>),
    RelativeOid(Vec<u64>),
    Enumerated(String),
    /// Every character-string kind (UTF8String, IA5String, PrintableString,
    /// TeletexString, ...) shares one `String` representation; alphabet
    /// legality is a constraint concern, not a value-shape concern.
    CharacterString(String),
    /// UTCTime/GeneralizedTime/DATE/TIME-OF-DAY/DATE-TIME/DURATION in
    /// their X.680 lexical form. Converting to/from platform date types
    /// is an external collaborator's job, not the core's.
    TimeString(String),
    Choice(String, Box<Value>),
    Sequence(IndexMap<String, Value>),
    Set(IndexMap<String, Value>),
    SequenceOf(Vec<Value>),
    SetOf(Vec<Value>),
    /// An ANY/open-type value: already-encoded bytes whose type is
    /// determined by context the value itself does not carry.
    OpenType(Vec<u8>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_octet_string(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_character_string(&self) -> Option<&str> {
        match self {
            Value::CharacterString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Sequence(m) | Value::Set(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence_of(&self) -> Option<&[Value]> {
        match self {
            Value::SequenceOf(v) | Value::SetOf(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Choice(name, v) => Some((name, v)),
            _ => None,
        }
    }
}

/// Converts a component's resolved `DEFAULT` literal into the same
/// [`Value`] shape a caller would supply, so an encoder can compare a
/// present component against it and omit the component when they're
/// equal, per X.690's DER invariant. Returns `None` when the literal
/// can't be converted with certainty (an unresolved OID name reference,
/// or a value notation this toolkit doesn't model as a constant) rather
/// than guess; callers treat `None` as "never omit".
pub fn raw_default_as_value(raw: &asn1_core::ast::RawValue) -> Option<Value> {
    use asn1_core::ast::{ObjIdComponent, RawValue};
    match raw {
        RawValue::Boolean(b) => Some(Value::Boolean(*b)),
        RawValue::Integer(i) => Some(Value::Integer(BigInt::from(*i))),
        RawValue::Real(r) => Some(Value::Real(*r)),
        RawValue::Null => Some(Value::Null),
        RawValue::BitString(bits) => {
            let bit_len = bits.len();
            let mut bytes = vec![0u8; bit_len.div_ceil(8)];
            for (i, bit) in bits.iter().enumerate() {
                if *bit {
                    bytes[i / 8] |= 1 << (7 - i % 8);
                }
            }
            BitStringValue::new(bytes, bit_len).ok().map(Value::BitString)
        }
        RawValue::OctetString(bytes) => Some(Value::OctetString(bytes.clone())),
        RawValue::CString(s) => Some(Value::CharacterString(s.clone())),
        RawValue::Enumerated(name) => Some(Value::Enumerated(name.clone())),
        RawValue::ObjectIdentifier(components) => {
            let mut arcs = Vec::with_capacity(components.len());
            for c in components {
                match c {
                    ObjIdComponent::Named(_, n) | ObjIdComponent::Numeric(n) => arcs.push(*n),
                    ObjIdComponent::NameOnly(_) => return None,
                }
            }
            Some(Value::ObjectIdentifier(arcs))
        }
        RawValue::Sequence(fields) => {
            let mut out = IndexMap::new();
            for (name, v) in fields {
                out.insert(name.clone(), raw_default_as_value(v)?);
            }
            Some(Value::Sequence(out))
        }
        RawValue::SequenceOf(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(raw_default_as_value(item)?);
            }
            Some(Value::SequenceOf(out))
        }
        RawValue::Choice(name, inner) => Some(Value::Choice(name.clone(), Box::new(raw_default_as_value(inner)?))),
        RawValue::Reference(_) | RawValue::Min | RawValue::Max => None,
    }
}
