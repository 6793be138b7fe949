//! Binary schema for persisted compiled specs.
//!
//! A `CompiledSpec` is a resolved [`TypeModel`] plus a chosen codec. This
//! module defines the on-disk shape of that pair directly, field by
//! field, rather than handing the model to a generic object serializer —
//! the format is versioned so a future schema change can still read (or
//! at least clearly reject) an older blob.

use std::sync::Arc;

use asn1_core::ast::{ObjIdComponent, RawValue};
use asn1_core::constraints::{AlphabetMask, Bound, Constraints, Interval};
use asn1_core::model::{NamedComponent, Tag, TagClass, TagMode, TypeArena, TypeId, TypeKind, TypeModel, TypeNode};
use indexmap::IndexMap;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"ASN1SPEC";
const SCHEMA_VERSION: u8 = 2;

/// Appends `model` to `out` in the blob format `to_bytes` produces; kept
/// separate from the codec byte so a caller persisting several codecs
/// against the same model could in principle share one model section
/// (not exercised by [`crate::CompiledSpec`], which persists one model
/// per codec for simplicity).
pub fn write_model(out: &mut Vec<u8>, model: &TypeModel) {
    out.extend_from_slice(MAGIC);
    out.push(SCHEMA_VERSION);
    write_arena(out, &model.arena);
    write_u32(out, model.modules.len() as u32);
    for (name, module) in model.modules.iter() {
        write_string(out, name);
        write_string(out, &module.name);
        write_u32(out, module.oid.len() as u32);
        for arc in &module.oid {
            write_u64(out, *arc);
        }
        write_u32(out, module.types.len() as u32);
        for (type_name, id) in module.types.iter() {
            write_string(out, type_name);
            write_u32(out, id.0);
        }
    }
}

pub fn read_model(bytes: &[u8]) -> Result<TypeModel> {
    let mut c = Cursor::new(bytes);
    if c.take(8)? != MAGIC.as_slice() {
        return Err(Error::Schema("missing magic header".to_string()));
    }
    let version = c.u8()?;
    if version != SCHEMA_VERSION {
        return Err(Error::Schema(format!("unsupported schema version {version}")));
    }
    let arena = read_arena(&mut c)?;
    let module_count = c.u32()?;
    let mut modules = IndexMap::new();
    for _ in 0..module_count {
        let key = c.string()?;
        let name = c.string()?;
        let oid_len = c.u32()?;
        let mut oid = Vec::with_capacity(oid_len as usize);
        for _ in 0..oid_len {
            oid.push(c.u64()?);
        }
        let type_count = c.u32()?;
        let mut types = IndexMap::new();
        for _ in 0..type_count {
            let type_name = c.string()?;
            types.insert(type_name, TypeId(c.u32()?));
        }
        modules.insert(key, asn1_core::model::ResolvedModule { name, oid, types });
    }
    Ok(TypeModel {
        arena: Arc::new(arena),
        modules: Arc::new(modules),
    })
}

fn write_arena(out: &mut Vec<u8>, arena: &TypeArena) {
    write_u32(out, arena.len() as u32);
    for i in 0..arena.len() {
        write_node(out, arena.get(TypeId(i as u32)));
    }
}

fn read_arena(c: &mut Cursor) -> Result<TypeArena> {
    let count = c.u32()?;
    let mut arena = TypeArena::new();
    for _ in 0..count {
        arena.push(read_node(c)?);
    }
    Ok(arena)
}

fn write_node(out: &mut Vec<u8>, node: &TypeNode) {
    write_option_string(out, &node.name);
    write_tag(out, &node.tag);
    write_constraints(out, &node.constraints);
    write_kind(out, &node.kind);
}

fn read_node(c: &mut Cursor) -> Result<TypeNode> {
    let name = c.option_string()?;
    let tag = read_tag(c)?;
    let constraints = read_constraints(c)?;
    let kind = read_kind(c)?;
    Ok(TypeNode { name, kind, tag, constraints })
}

fn write_tag(out: &mut Vec<u8>, tag: &Tag) {
    out.push(match tag.class {
        TagClass::Universal => 0,
        TagClass::Application => 1,
        TagClass::ContextSpecific => 2,
        TagClass::Private => 3,
    });
    write_u32(out, tag.number);
    out.push(match tag.mode {
        TagMode::Explicit => 0,
        TagMode::Implicit => 1,
    });
}

fn read_tag(c: &mut Cursor) -> Result<Tag> {
    let class = match c.u8()? {
        0 => TagClass::Universal,
        1 => TagClass::Application,
        2 => TagClass::ContextSpecific,
        3 => TagClass::Private,
        n => return Err(Error::Schema(format!("bad tag class discriminant {n}"))),
    };
    let number = c.u32()?;
    let mode = match c.u8()? {
        0 => TagMode::Explicit,
        1 => TagMode::Implicit,
        n => return Err(Error::Schema(format!("bad tag mode discriminant {n}"))),
    };
    Ok(Tag { class, number, mode })
}

fn write_named_component(out: &mut Vec<u8>, c: &NamedComponent) {
    write_string(out, &c.name);
    write_u32(out, c.ty.0);
    out.push(c.optional as u8);
    write_option_raw_value(out, &c.default);
    out.push(c.extension_addition as u8);
    match c.group_id {
        Some(g) => {
            out.push(1);
            write_u32(out, g);
        }
        None => out.push(0),
    }
}

fn read_named_component(c: &mut Cursor) -> Result<NamedComponent> {
    let name = c.string()?;
    let ty = TypeId(c.u32()?);
    let optional = c.bool()?;
    let default = read_option_raw_value(c)?;
    let extension_addition = c.bool()?;
    let group_id = if c.bool()? { Some(c.u32()?) } else { None };
    Ok(NamedComponent { name, ty, optional, default, extension_addition, group_id })
}

fn write_option_raw_value(out: &mut Vec<u8>, v: &Option<RawValue>) {
    match v {
        Some(v) => {
            out.push(1);
            write_raw_value(out, v);
        }
        None => out.push(0),
    }
}

fn read_option_raw_value(c: &mut Cursor) -> Result<Option<RawValue>> {
    if c.bool()? {
        Ok(Some(read_raw_value(c)?))
    } else {
        Ok(None)
    }
}

fn write_raw_value(out: &mut Vec<u8>, v: &RawValue) {
    match v {
        RawValue::Boolean(b) => {
            out.push(0);
            out.push(*b as u8);
        }
        RawValue::Integer(i) => {
            out.push(1);
            write_bigint(out, &BigInt::from(*i));
        }
        RawValue::Real(r) => {
            out.push(2);
            out.extend_from_slice(&r.to_be_bytes());
        }
        RawValue::Null => out.push(3),
        RawValue::BitString(bits) => {
            out.push(4);
            write_u32(out, bits.len() as u32);
            for b in bits {
                out.push(*b as u8);
            }
        }
        RawValue::OctetString(bytes) => {
            out.push(5);
            write_u32(out, bytes.len() as u32);
            out.extend_from_slice(bytes);
        }
        RawValue::CString(s) => {
            out.push(6);
            write_string(out, s);
        }
        RawValue::ObjectIdentifier(components) => {
            out.push(7);
            write_u32(out, components.len() as u32);
            for comp in components {
                write_obj_id_component(out, comp);
            }
        }
        RawValue::Enumerated(name) => {
            out.push(8);
            write_string(out, name);
        }
        RawValue::Sequence(fields) => {
            out.push(9);
            write_u32(out, fields.len() as u32);
            for (name, v) in fields {
                write_string(out, name);
                write_raw_value(out, v);
            }
        }
        RawValue::SequenceOf(items) => {
            out.push(10);
            write_u32(out, items.len() as u32);
            for item in items {
                write_raw_value(out, item);
            }
        }
        RawValue::Choice(name, inner) => {
            out.push(11);
            write_string(out, name);
            write_raw_value(out, inner);
        }
        RawValue::Reference(name) => {
            out.push(12);
            write_string(out, name);
        }
        RawValue::Min => out.push(13),
        RawValue::Max => out.push(14),
    }
}

fn read_raw_value(c: &mut Cursor) -> Result<RawValue> {
    Ok(match c.u8()? {
        0 => RawValue::Boolean(c.bool()?),
        1 => RawValue::Integer(
            c.bigint()?
                .to_i128()
                .ok_or_else(|| Error::Schema("RawValue::Integer out of i128 range".to_string()))?,
        ),
        2 => RawValue::Real(f64::from_be_bytes(c.take(8)?.try_into().unwrap())),
        3 => RawValue::Null,
        4 => {
            let count = c.u32()?;
            let mut bits = Vec::with_capacity(count as usize);
            for _ in 0..count {
                bits.push(c.bool()?);
            }
            RawValue::BitString(bits)
        }
        5 => {
            let count = c.u32()?;
            RawValue::OctetString(c.take(count as usize)?.to_vec())
        }
        6 => RawValue::CString(c.string()?),
        7 => {
            let count = c.u32()?;
            let mut components = Vec::with_capacity(count as usize);
            for _ in 0..count {
                components.push(read_obj_id_component(c)?);
            }
            RawValue::ObjectIdentifier(components)
        }
        8 => RawValue::Enumerated(c.string()?),
        9 => {
            let count = c.u32()?;
            let mut fields = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = c.string()?;
                fields.push((name, read_raw_value(c)?));
            }
            RawValue::Sequence(fields)
        }
        10 => {
            let count = c.u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_raw_value(c)?);
            }
            RawValue::SequenceOf(items)
        }
        11 => {
            let name = c.string()?;
            RawValue::Choice(name, Box::new(read_raw_value(c)?))
        }
        12 => RawValue::Reference(c.string()?),
        13 => RawValue::Min,
        14 => RawValue::Max,
        n => return Err(Error::Schema(format!("bad raw-value discriminant {n}"))),
    })
}

fn write_obj_id_component(out: &mut Vec<u8>, c: &ObjIdComponent) {
    match c {
        ObjIdComponent::Named(name, n) => {
            out.push(0);
            write_string(out, name);
            write_u64(out, *n);
        }
        ObjIdComponent::Numeric(n) => {
            out.push(1);
            write_u64(out, *n);
        }
        ObjIdComponent::NameOnly(name) => {
            out.push(2);
            write_string(out, name);
        }
    }
}

fn read_obj_id_component(c: &mut Cursor) -> Result<ObjIdComponent> {
    Ok(match c.u8()? {
        0 => ObjIdComponent::Named(c.string()?, c.u64()?),
        1 => ObjIdComponent::Numeric(c.u64()?),
        2 => ObjIdComponent::NameOnly(c.string()?),
        n => return Err(Error::Schema(format!("bad object-identifier-component discriminant {n}"))),
    })
}

fn write_kind(out: &mut Vec<u8>, kind: &TypeKind) {
    match kind {
        TypeKind::Boolean => out.push(0),
        TypeKind::Integer => out.push(1),
        TypeKind::Real => out.push(2),
        TypeKind::Null => out.push(3),
        TypeKind::BitString => out.push(4),
        TypeKind::OctetString => out.push(5),
        TypeKind::ObjectIdentifier => out.push(6),
        TypeKind::RelativeOid => out.push(7),
        TypeKind::Enumerated(items) => {
            out.push(8);
            write_u32(out, items.len() as u32);
            for (name, value) in items {
                write_string(out, name);
                write_bigint(out, &BigInt::from(*value));
            }
        }
        TypeKind::Utf8String => out.push(9),
        TypeKind::Ia5String => out.push(10),
        TypeKind::PrintableString => out.push(11),
        TypeKind::NumericString => out.push(12),
        TypeKind::VisibleString => out.push(13),
        TypeKind::GeneralString => out.push(14),
        TypeKind::BmpString => out.push(15),
        TypeKind::UniversalString => out.push(16),
        TypeKind::TeletexString => out.push(17),
        TypeKind::GraphicString => out.push(18),
        TypeKind::UtcTime => out.push(19),
        TypeKind::GeneralizedTime => out.push(20),
        TypeKind::Date => out.push(21),
        TypeKind::TimeOfDay => out.push(22),
        TypeKind::DateTime => out.push(23),
        TypeKind::Duration => out.push(24),
        TypeKind::ObjectDescriptor => out.push(25),
        TypeKind::External => out.push(26),
        TypeKind::EmbeddedPdv => out.push(27),
        TypeKind::CharacterString => out.push(28),
        TypeKind::Choice { alternatives, extensible } => {
            out.push(29);
            write_u32(out, alternatives.len() as u32);
            for alt in alternatives {
                write_named_component(out, alt);
            }
            out.push(*extensible as u8);
        }
        TypeKind::Sequence { components, extensible } => {
            out.push(30);
            write_u32(out, components.len() as u32);
            for comp in components {
                write_named_component(out, comp);
            }
            out.push(*extensible as u8);
        }
        TypeKind::Set { components, extensible } => {
            out.push(31);
            write_u32(out, components.len() as u32);
            for comp in components {
                write_named_component(out, comp);
            }
            out.push(*extensible as u8);
        }
        TypeKind::SequenceOf(inner) => {
            out.push(32);
            write_u32(out, inner.0);
        }
        TypeKind::SetOf(inner) => {
            out.push(33);
            write_u32(out, inner.0);
        }
        TypeKind::Any => out.push(34),
        TypeKind::AnyDefinedBy(field) => {
            out.push(35);
            write_string(out, field);
        }
        TypeKind::OpenType => out.push(36),
        TypeKind::Reference(name) => {
            out.push(37);
            write_string(out, name);
        }
    }
}

fn read_kind(c: &mut Cursor) -> Result<TypeKind> {
    Ok(match c.u8()? {
        0 => TypeKind::Boolean,
        1 => TypeKind::Integer,
        2 => TypeKind::Real,
        3 => TypeKind::Null,
        4 => TypeKind::BitString,
        5 => TypeKind::OctetString,
        6 => TypeKind::ObjectIdentifier,
        7 => TypeKind::RelativeOid,
        8 => {
            let count = c.u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = c.string()?;
                let value = c.bigint()?.to_i128().ok_or_else(|| Error::Schema("ENUMERATED value out of i128 range".to_string()))?;
                items.push((name, value));
            }
            TypeKind::Enumerated(items)
        }
        9 => TypeKind::Utf8String,
        10 => TypeKind::Ia5String,
        11 => TypeKind::PrintableString,
        12 => TypeKind::NumericString,
        13 => TypeKind::VisibleString,
        14 => TypeKind::GeneralString,
        15 => TypeKind::BmpString,
        16 => TypeKind::UniversalString,
        17 => TypeKind::TeletexString,
        18 => TypeKind::GraphicString,
        19 => TypeKind::UtcTime,
        20 => TypeKind::GeneralizedTime,
        21 => TypeKind::Date,
        22 => TypeKind::TimeOfDay,
        23 => TypeKind::DateTime,
        24 => TypeKind::Duration,
        25 => TypeKind::ObjectDescriptor,
        26 => TypeKind::External,
        27 => TypeKind::EmbeddedPdv,
        28 => TypeKind::CharacterString,
        29 => {
            let count = c.u32()?;
            let mut alternatives = Vec::with_capacity(count as usize);
            for _ in 0..count {
                alternatives.push(read_named_component(c)?);
            }
            let extensible = c.bool()?;
            TypeKind::Choice { alternatives, extensible }
        }
        30 => {
            let count = c.u32()?;
            let mut components = Vec::with_capacity(count as usize);
            for _ in 0..count {
                components.push(read_named_component(c)?);
            }
            let extensible = c.bool()?;
            TypeKind::Sequence { components, extensible }
        }
        31 => {
            let count = c.u32()?;
            let mut components = Vec::with_capacity(count as usize);
            for _ in 0..count {
                components.push(read_named_component(c)?);
            }
            let extensible = c.bool()?;
            TypeKind::Set { components, extensible }
        }
        32 => TypeKind::SequenceOf(TypeId(c.u32()?)),
        33 => TypeKind::SetOf(TypeId(c.u32()?)),
        34 => TypeKind::Any,
        35 => TypeKind::AnyDefinedBy(c.string()?),
        36 => TypeKind::OpenType,
        37 => TypeKind::Reference(c.string()?),
        n => return Err(Error::Schema(format!("bad type-kind discriminant {n}"))),
    })
}

fn write_constraints(out: &mut Vec<u8>, c: &Constraints) {
    write_option_interval(out, &c.value_root);
    write_option_interval(out, &c.value_extension);
    write_option_interval(out, &c.size_root);
    write_option_interval(out, &c.size_extension);
    match &c.alphabet {
        Some(mask) => {
            out.push(1);
            write_u32(out, mask.code_points.len() as u32);
            for (lo, hi) in &mask.code_points {
                write_u32(out, *lo);
                write_u32(out, *hi);
            }
        }
        None => out.push(0),
    }
    write_option_string(out, &c.pattern);
    out.push(c.extensible as u8);
}

fn read_constraints(c: &mut Cursor) -> Result<Constraints> {
    let value_root = read_option_interval(c)?;
    let value_extension = read_option_interval(c)?;
    let size_root = read_option_interval(c)?;
    let size_extension = read_option_interval(c)?;
    let alphabet = if c.bool()? {
        let count = c.u32()?;
        let mut code_points = Vec::with_capacity(count as usize);
        for _ in 0..count {
            code_points.push((c.u32()?, c.u32()?));
        }
        Some(AlphabetMask { code_points })
    } else {
        None
    };
    let pattern = c.option_string()?;
    let extensible = c.bool()?;
    Ok(Constraints { value_root, value_extension, size_root, size_extension, alphabet, pattern, extensible })
}

fn write_option_interval(out: &mut Vec<u8>, i: &Option<Interval>) {
    match i {
        Some(i) => {
            out.push(1);
            write_bound(out, &i.lo);
            write_bound(out, &i.hi);
        }
        None => out.push(0),
    }
}

fn read_option_interval(c: &mut Cursor) -> Result<Option<Interval>> {
    if c.bool()? {
        let lo = read_bound(c)?;
        let hi = read_bound(c)?;
        Ok(Some(Interval { lo, hi }))
    } else {
        Ok(None)
    }
}

fn write_bound(out: &mut Vec<u8>, b: &Bound) {
    match b {
        Bound::NegInfinity => out.push(0),
        Bound::PosInfinity => out.push(1),
        Bound::Finite(n) => {
            out.push(2);
            write_bigint(out, n);
        }
    }
}

fn read_bound(c: &mut Cursor) -> Result<Bound> {
    Ok(match c.u8()? {
        0 => Bound::NegInfinity,
        1 => Bound::PosInfinity,
        2 => Bound::Finite(c.bigint()?),
        n => return Err(Error::Schema(format!("bad bound discriminant {n}"))),
    })
}

fn write_bigint(out: &mut Vec<u8>, n: &BigInt) {
    let bytes = n.to_signed_bytes_be();
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(&bytes);
}

fn write_u32(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_be_bytes());
}

fn write_u64(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(&n.to_be_bytes());
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

fn write_option_string(out: &mut Vec<u8>, s: &Option<String>) {
    match s {
        Some(s) => {
            out.push(1);
            write_string(out, s);
        }
        None => out.push(0),
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(Error::Schema("unexpected end of blob".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        String::from_utf8(self.take(len)?.to_vec()).map_err(|e| Error::Schema(e.to_string()))
    }

    fn option_string(&mut self) -> Result<Option<String>> {
        if self.bool()? {
            Ok(Some(self.string()?))
        } else {
            Ok(None)
        }
    }

    fn bigint(&mut self) -> Result<BigInt> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        if bytes.is_empty() {
            Ok(BigInt::new(Sign::NoSign, vec![]))
        } else {
            Ok(BigInt::from_signed_bytes_be(bytes))
        }
    }
}
