//! PER/UPER content decoding, mirroring [`super::encoder`]'s framing
//! choices exactly (they must agree bit-for-bit for round trips to work).

use asn1_core::constraints::{interval_to_i64_bounds, Constraints};
use asn1_core::model::{TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;

use crate::error::{DecodeError, DecodeResult};
use crate::value::{BitStringValue, Value};

use super::bitstream::{bits_for_range, BitReader};

pub struct PerDecoder<'m> {
    model: &'m TypeModel,
    aligned: bool,
}

impl<'m> PerDecoder<'m> {
    pub fn new(model: &'m TypeModel, aligned: bool) -> Self {
        Self { model, aligned }
    }

    pub fn decode(&self, type_id: TypeId, buf: &[u8], path: &str) -> DecodeResult<Value> {
        let mut r = BitReader::new(buf, path);
        decode_node(self.model, self.aligned, &mut r, type_id, path)
    }
}

fn maybe_align(r: &mut BitReader, aligned: bool) {
    if aligned {
        r.align();
    }
}

pub fn decode_node(model: &TypeModel, aligned: bool, r: &mut BitReader, id: TypeId, path: &str) -> DecodeResult<Value> {
    let node = model.node(id);
    match &node.kind {
        TypeKind::Boolean => Ok(Value::Boolean(r.read_bit()?)),
        TypeKind::Integer => decode_integer(r, aligned, &node.constraints, path),
        TypeKind::Enumerated(items) => {
            let width = bits_for_range((items.len() - 1) as u64);
            let index = r.read_bits(width)? as usize;
            let (name, _) = items
                .get(index)
                .ok_or_else(|| DecodeError::new(path, r.bit_pos() / 8, "ENUMERATED index out of range"))?;
            Ok(Value::Enumerated(name.clone()))
        }
        TypeKind::Null => Ok(Value::Null),
        TypeKind::BitString => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            maybe_align(r, aligned);
            let mut bytes = vec![0u8; len.div_ceil(8)];
            for i in 0..len {
                if r.read_bit()? {
                    bytes[i / 8] |= 0x80 >> (i % 8);
                }
            }
            let bits = BitStringValue::new(bytes, len).map_err(|e| DecodeError::new(path, 0, e.message))?;
            Ok(Value::BitString(bits))
        }
        TypeKind::OctetString => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            maybe_align(r, aligned);
            Ok(Value::OctetString(r.read_bytes(len)?))
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
        | TypeKind::CharacterString => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            maybe_align(r, aligned);
            let bytes = r.read_bytes(len)?;
            String::from_utf8(bytes)
                .map(Value::CharacterString)
                .map_err(|e| DecodeError::new(path, 0, e.to_string()))
        }
        TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            maybe_align(r, aligned);
            let bytes = r.read_bytes(len)?;
            String::from_utf8(bytes)
                .map(Value::TimeString)
                .map_err(|e| DecodeError::new(path, 0, e.to_string()))
        }
        TypeKind::ObjectIdentifier => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            maybe_align(r, aligned);
            let bytes = r.read_bytes(len)?;
            Ok(Value::ObjectIdentifier(crate::ber::support::decode_oid_arcs(&bytes, path)?))
        }
        TypeKind::Choice { alternatives, .. } => {
            let width = bits_for_range((alternatives.len() - 1) as u64);
            let index = r.read_bits(width)? as usize;
            let alt = alternatives
                .get(index)
                .ok_or_else(|| DecodeError::new(path, r.bit_pos() / 8, "CHOICE index out of range"))?;
            let value = decode_node(model, aligned, r, alt.ty, &format!("{path}.{}", alt.name))?;
            Ok(Value::Choice(alt.name.clone(), Box::new(value)))
        }
        TypeKind::Sequence { components, extensible } | TypeKind::Set { components, extensible } => {
            let has_extension = if *extensible { r.read_bit()? } else { false };
            let optionals: Vec<_> = components.iter().filter(|c| !c.extension_addition && (c.optional || c.has_default())).collect();
            let mut present = std::collections::HashSet::new();
            for c in &optionals {
                if r.read_bit()? {
                    present.insert(c.name.clone());
                }
            }
            let mut fields = indexmap::IndexMap::new();
            for c in components.iter().filter(|c| !c.extension_addition) {
                if c.optional || c.has_default() {
                    if !present.contains(&c.name) {
                        continue;
                    }
                }
                let value = decode_node(model, aligned, r, c.ty, &format!("{path}.{}", c.name))?;
                fields.insert(c.name.clone(), value);
            }
            let additions: Vec<_> = components.iter().filter(|c| c.extension_addition).collect();
            if has_extension && !additions.is_empty() {
                let mut addition_present = Vec::new();
                for _ in &additions {
                    addition_present.push(r.read_bit()?);
                }
                for (c, present) in additions.iter().zip(addition_present) {
                    if !present {
                        continue;
                    }
                    let len = decode_length(r, true, &Constraints::none(), path)?;
                    maybe_align(r, true);
                    let bytes = r.read_bytes(len)?;
                    let value = decode_open_type(model, aligned, c.ty, &bytes, &format!("{path}.{}", c.name))?;
                    fields.insert(c.name.clone(), value);
                }
            }
            if matches!(node.kind, TypeKind::Set { .. }) {
                Ok(Value::Set(fields))
            } else {
                Ok(Value::Sequence(fields))
            }
        }
        TypeKind::SequenceOf(inner) | TypeKind::SetOf(inner) => {
            let len = decode_length(r, aligned, &node.constraints, path)?;
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(decode_node(model, aligned, r, *inner, &format!("{path}[{i}]"))?);
            }
            if matches!(node.kind, TypeKind::SetOf(_)) {
                Ok(Value::SetOf(items))
            } else {
                Ok(Value::SequenceOf(items))
            }
        }
        TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType => {
            let len = decode_length(r, true, &Constraints::none(), path)?;
            maybe_align(r, true);
            Ok(Value::OpenType(r.read_bytes(len)?))
        }
        TypeKind::Real | TypeKind::ObjectDescriptor | TypeKind::External | TypeKind::EmbeddedPdv | TypeKind::RelativeOid | TypeKind::Reference(_) => {
            Err(DecodeError::new(path, r.bit_pos() / 8, "decoding this type in PER is not implemented"))
        }
    }
}

fn decode_open_type(model: &TypeModel, aligned: bool, id: TypeId, bytes: &[u8], path: &str) -> DecodeResult<Value> {
    if let TypeKind::Boolean = model.node(id).kind {
        let b = *bytes.first().ok_or_else(|| DecodeError::new(path, 0, "empty open-type BOOLEAN"))? != 0;
        return Ok(Value::Boolean(b));
    }
    let mut r = BitReader::new(bytes, path);
    decode_node(model, aligned, &mut r, id, path)
}

fn decode_integer(r: &mut BitReader, aligned: bool, constraints: &Constraints, path: &str) -> DecodeResult<Value> {
    if constraints.value_is_finite_root() {
        let (lo, hi) = interval_to_i64_bounds(constraints.value_root.as_ref().unwrap());
        if let (Some(lo), Some(hi)) = (lo, hi) {
            if constraints.extensible {
                let is_extension = r.read_bit()?;
                if !is_extension {
                    let width = bits_for_range((hi - lo) as u64);
                    let offset = r.read_bits(width)? as i64;
                    return Ok(Value::Integer(BigInt::from(lo + offset)));
                }
            } else {
                let width = bits_for_range((hi - lo) as u64);
                let offset = r.read_bits(width)? as i64;
                return Ok(Value::Integer(BigInt::from(lo + offset)));
            }
        }
    }
    let lo = constraints.value_root.as_ref().and_then(|i| interval_to_i64_bounds(i).0);
    let len = decode_length(r, aligned, &Constraints::none(), path)?;
    maybe_align(r, aligned);
    let bytes = r.read_bytes(len)?;
    let raw = if lo.is_some() {
        BigInt::from_bytes_be(num_bigint::Sign::Plus, &bytes)
    } else {
        BigInt::from_signed_bytes_be(&bytes)
    };
    Ok(Value::Integer(match lo {
        Some(lo) => raw + BigInt::from(lo),
        None => raw,
    }))
}

fn decode_length(r: &mut BitReader, aligned: bool, constraints: &Constraints, path: &str) -> DecodeResult<usize> {
    if constraints.size_is_finite_root() && !constraints.extensible {
        let (lo, hi) = interval_to_i64_bounds(constraints.size_root.as_ref().unwrap());
        if let (Some(lo), Some(hi)) = (lo, hi) {
            let width = bits_for_range((hi - lo) as u64);
            let offset = r.read_bits(width)? as i64;
            return Ok((lo + offset) as usize);
        }
    }
    maybe_align(r, aligned);
    let first = r.read_bits(8)?;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    if first & 0xC0 == 0xC0 {
        return Err(DecodeError::new(
            path,
            0,
            "fragmented PER length determinant is not supported",
        ));
    }
    let second = r.read_bits(8)?;
    Ok((((first & 0x7F) << 8) | second) as usize)
}
