//! PER/UPER content encoding (X.691). Length determinants and open-type
//! wrappers always align to an octet boundary in this implementation,
//! in both the aligned and unaligned variants; the difference the
//! `aligned` flag makes is whether ordinary field values do.
//!
//! Unbounded-length fragmentation (10.9.3.8) is not implemented: a
//! length determinant over 16384 returns `Unsupported`.

use asn1_core::constraints::interval_to_i64_bounds;
use asn1_core::model::{TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{EncodeError, EncodeResult};
use crate::value::{raw_default_as_value, Value};

use super::bitstream::{bits_for_range, BitWriter};

pub struct PerEncoder<'m> {
    model: &'m TypeModel,
    aligned: bool,
}

impl<'m> PerEncoder<'m> {
    pub fn new(model: &'m TypeModel, aligned: bool) -> Self {
        Self { model, aligned }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
        let mut w = BitWriter::new();
        encode_node(self.model, self.aligned, &mut w, type_id, value, path)?;
        Ok(w.into_bytes())
    }
}

fn maybe_align(w: &mut BitWriter, aligned: bool) {
    if aligned {
        w.align();
    }
}

pub fn encode_node(
    model: &TypeModel,
    aligned: bool,
    w: &mut BitWriter,
    id: TypeId,
    value: &Value,
    path: &str,
) -> EncodeResult<()> {
    let node = model.node(id);
    match (&node.kind, value) {
        (TypeKind::Boolean, Value::Boolean(b)) => {
            w.write_bit(*b);
            Ok(())
        }
        (TypeKind::Integer, Value::Integer(n)) => encode_integer(w, aligned, &node.constraints, n, path),
        (TypeKind::Enumerated(items), Value::Enumerated(name)) => {
            let index = items
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such ENUMERATED value `{name}`")))?;
            let width = bits_for_range((items.len() - 1) as u64);
            w.write_bits(index as u64, width);
            Ok(())
        }
        (TypeKind::Null, Value::Null) => Ok(()),
        (TypeKind::BitString, Value::BitString(bits)) => {
            let len = bits.bit_len();
            encode_length(w, aligned, &node.constraints, len, path)?;
            maybe_align(w, aligned);
            for i in 0..len {
                w.write_bit(bits.get(i).unwrap_or(false));
            }
            Ok(())
        }
        (TypeKind::OctetString, Value::OctetString(bytes)) => {
            encode_length(w, aligned, &node.constraints, bytes.len(), path)?;
            maybe_align(w, aligned);
            w.write_bytes(bytes);
            Ok(())
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
        ) => {
            let bytes = s.as_bytes();
            encode_length(w, aligned, &node.constraints, bytes.len(), path)?;
            maybe_align(w, aligned);
            w.write_bytes(bytes);
            Ok(())
        }
        (
            TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration,
            Value::TimeString(s),
        ) => {
            let bytes = s.as_bytes();
            encode_length(w, aligned, &node.constraints, bytes.len(), path)?;
            maybe_align(w, aligned);
            w.write_bytes(bytes);
            Ok(())
        }
        (TypeKind::ObjectIdentifier, Value::ObjectIdentifier(arcs)) => {
            let mut content = Vec::new();
            crate::ber::support::encode_oid_arcs(arcs, &mut content)?;
            encode_length(w, aligned, &node.constraints, content.len(), path)?;
            maybe_align(w, aligned);
            w.write_bytes(&content);
            Ok(())
        }
        (TypeKind::Choice { alternatives, .. }, Value::Choice(name, inner)) => {
            let index = alternatives
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| EncodeError::new(path, format!("no such CHOICE alternative `{name}`")))?;
            let width = bits_for_range((alternatives.len() - 1) as u64);
            w.write_bits(index as u64, width);
            encode_node(model, aligned, w, alternatives[index].ty, inner, &format!("{path}.{name}"))
        }
        (TypeKind::Sequence { components, extensible }, Value::Sequence(fields))
        | (TypeKind::Set { components, extensible }, Value::Set(fields)) => {
            if *extensible {
                let has_extension = components.iter().any(|c| c.extension_addition && fields.contains_key(&c.name));
                w.write_bit(has_extension);
            }
            let is_present = |c: &asn1_core::model::NamedComponent| match fields.get(&c.name) {
                Some(v) => c.default.as_ref().and_then(raw_default_as_value).as_ref() != Some(v),
                None => false,
            };
            let optionals: Vec<_> = components.iter().filter(|c| !c.extension_addition && (c.optional || c.has_default())).collect();
            for c in &optionals {
                w.write_bit(is_present(c));
            }
            for c in components.iter().filter(|c| !c.extension_addition) {
                if is_present(c) {
                    encode_node(model, aligned, w, c.ty, fields.get(&c.name).unwrap(), &format!("{path}.{}", c.name))?;
                } else if fields.get(&c.name).is_none() && !(c.optional || c.has_default()) {
                    return Err(EncodeError::new(path, format!("missing required component `{}`", c.name)));
                }
            }
            let additions: Vec<_> = components.iter().filter(|c| c.extension_addition).collect();
            if !additions.is_empty() {
                for c in &additions {
                    w.write_bit(fields.contains_key(&c.name));
                }
                for c in &additions {
                    if let Some(v) = fields.get(&c.name) {
                        let content = encode_open_type(model, aligned, c.ty, v, &format!("{path}.{}", c.name))?;
                        encode_length(w, true, &asn1_core::constraints::Constraints::none(), content.len(), path)?;
                        maybe_align(w, true);
                        w.write_bytes(&content);
                    }
                }
            }
            Ok(())
        }
        (TypeKind::SequenceOf(inner), Value::SequenceOf(items)) | (TypeKind::SetOf(inner), Value::SetOf(items)) => {
            encode_length(w, aligned, &node.constraints, items.len(), path)?;
            for (i, item) in items.iter().enumerate() {
                encode_node(model, aligned, w, *inner, item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        (TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType, Value::OpenType(bytes)) => {
            encode_length(w, true, &asn1_core::constraints::Constraints::none(), bytes.len(), path)?;
            maybe_align(w, true);
            w.write_bytes(bytes);
            Ok(())
        }
        _ => Err(EncodeError::new(path, "value shape does not match declared type")),
    }
}

/// The value of an extension addition is always encoded as an open
/// type: its own complete PER encoding, octet-aligned as a whole.
fn encode_open_type(model: &TypeModel, aligned: bool, id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
    if let TypeKind::Boolean = model.node(id).kind {
        let b = value.as_bool().ok_or_else(|| EncodeError::new(path, "expected BOOLEAN"))?;
        return Ok(vec![if b { 0xFF } else { 0x00 }]);
    }
    let mut w = BitWriter::new();
    encode_node(model, aligned, &mut w, id, value, path)?;
    Ok(w.into_bytes())
}

fn encode_integer(w: &mut BitWriter, aligned: bool, constraints: &asn1_core::constraints::Constraints, n: &BigInt, path: &str) -> EncodeResult<()> {
    if constraints.value_is_finite_root() {
        let (lo, hi) = interval_to_i64_bounds(constraints.value_root.as_ref().unwrap());
        let lo = lo.ok_or_else(|| EncodeError::new(path, "finite root with no lower bound"))?;
        let hi = hi.ok_or_else(|| EncodeError::new(path, "finite root with no upper bound"))?;
        let v = n.to_i64().ok_or_else(|| EncodeError::new(path, "value out of i64 range"))?;
        if constraints.extensible {
            let in_root = v >= lo && v <= hi;
            w.write_bit(!in_root);
            if in_root {
                let width = bits_for_range((hi - lo) as u64);
                w.write_bits((v - lo) as u64, width);
                return Ok(());
            }
        } else if v < lo || v > hi {
            return Err(EncodeError::new(path, "value outside its root range"));
        } else {
            let width = bits_for_range((hi - lo) as u64);
            w.write_bits((v - lo) as u64, width);
            return Ok(());
        }
    }
    // Semi-constrained (lower bound only) or fully unconstrained: general
    // length-prefixed two's-complement encoding.
    let lo = constraints
        .value_root
        .as_ref()
        .and_then(|i| interval_to_i64_bounds(i).0);
    let shifted = match lo {
        Some(lo) => n - BigInt::from(lo),
        None => n.clone(),
    };
    let bytes = if lo.is_some() {
        unsigned_minimal_bytes(&shifted)
    } else {
        crate::ber::encoder::two_s_complement_bytes(&shifted)
    };
    encode_length(w, aligned, &asn1_core::constraints::Constraints::none(), bytes.len(), path)?;
    maybe_align(w, aligned);
    w.write_bytes(&bytes);
    Ok(())
}

fn unsigned_minimal_bytes(n: &BigInt) -> Vec<u8> {
    let (_, bytes) = n.to_bytes_be();
    if bytes.is_empty() {
        vec![0]
    } else {
        bytes
    }
}

/// X.691 clause 10.9: short form for counts under 128, two-octet form
/// up to 16383; larger counts require fragmentation, which this
/// implementation does not support.
fn encode_length(w: &mut BitWriter, aligned: bool, constraints: &asn1_core::constraints::Constraints, len: usize, path: &str) -> EncodeResult<()> {
    if constraints.size_is_finite_root() && !constraints.extensible {
        let (lo, hi) = interval_to_i64_bounds(constraints.size_root.as_ref().unwrap());
        if let (Some(lo), Some(hi)) = (lo, hi) {
            let width = bits_for_range((hi - lo) as u64);
            w.write_bits((len as i64 - lo) as u64, width);
            return Ok(());
        }
    }
    maybe_align(w, aligned);
    if len < 128 {
        w.write_bits(len as u64, 8);
    } else if len < 16384 {
        w.write_bits(0x8000 | len as u64, 16);
    } else {
        return Err(EncodeError::new(
            path,
            format!("fragmented PER length determinant for {len} elements is not supported"),
        ));
    }
    Ok(())
}
