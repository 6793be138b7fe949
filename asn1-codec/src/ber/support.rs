//! Helpers shared between the BER encoder and decoder: mapping model
//! tag/kind information onto wire tags, and the few encodings (OID,
//! character strings) that don't reduce to a single byte-copy.

use asn1_core::model::{TagClass as ModelTagClass, TypeKind, TypeModel, TypeId};

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

use super::types::{BerTag, BerTagClass};

pub fn class_of(c: ModelTagClass) -> BerTagClass {
    match c {
        ModelTagClass::Universal => BerTagClass::Universal,
        ModelTagClass::Application => BerTagClass::Application,
        ModelTagClass::ContextSpecific => BerTagClass::ContextSpecific,
        ModelTagClass::Private => BerTagClass::Private,
    }
}

/// A node tagged `[UNIVERSAL 0]` (implicit) carries no tag of its own;
/// the resolver uses this as the sentinel for CHOICE/ANY/open types,
/// none of which have a universal tag number to fall back to.
pub fn is_self_tagged(node: &asn1_core::model::TypeNode) -> bool {
    node.tag.class == ModelTagClass::Universal
        && node.tag.number == 0
        && node.tag.mode == asn1_core::model::TagMode::Implicit
}

pub fn is_constructed_kind(kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Sequence { .. } | TypeKind::Set { .. } | TypeKind::SequenceOf(_) | TypeKind::SetOf(_)
    )
}

/// The wire tags a value of this type can show up under. Empty means
/// "matches anything" (ANY / open types, which borrow their tag from
/// whatever content follows).
pub fn candidate_tags(model: &TypeModel, id: TypeId) -> Vec<BerTag> {
    let node = model.node(id);
    if is_self_tagged(node) {
        match &node.kind {
            TypeKind::Choice { alternatives, .. } => alternatives
                .iter()
                .flat_map(|c| candidate_tags(model, c.ty))
                .collect(),
            _ => Vec::new(),
        }
    } else {
        vec![BerTag::new(
            class_of(node.tag.class),
            is_constructed_kind(&node.kind),
            node.tag.number,
        )]
    }
}

pub fn tag_matches(candidates: &[BerTag], seen: BerTag) -> bool {
    candidates.is_empty() || candidates.iter().any(|t| t.class == seen.class && t.number == seen.number)
}

/// X.690 clause 8.19: OBJECT IDENTIFIER arc encoding. The first two arcs
/// collapse into one group, `arc0 * 40 + arc1`; every following arc is
/// base-128 with a continuation bit on all but the last byte.
pub fn encode_oid_arcs(arcs: &[u64], out: &mut Vec<u8>) -> EncodeResult<()> {
    if arcs.len() < 2 {
        return Err(EncodeError::new("", "object identifier needs at least two arcs"));
    }
    encode_base128(arcs[0] * 40 + arcs[1], out);
    for arc in &arcs[2..] {
        encode_base128(*arc, out);
    }
    Ok(())
}

pub fn encode_relative_oid_arcs(arcs: &[u64], out: &mut Vec<u8>) {
    for arc in arcs {
        encode_base128(*arc, out);
    }
}

fn encode_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut groups = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    groups.reverse();
    out.extend_from_slice(&groups);
}

pub fn decode_oid_arcs(content: &[u8], path: &str) -> DecodeResult<Vec<u64>> {
    let groups = decode_base128_groups(content, path)?;
    let mut iter = groups.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| DecodeError::new(path, 0, "empty object identifier"))?;
    let (arc0, arc1) = if first >= 80 { (2, first - 80) } else { (first / 40, first % 40) };
    let mut arcs = vec![arc0, arc1];
    arcs.extend(iter);
    Ok(arcs)
}

pub fn decode_relative_oid_arcs(content: &[u8], path: &str) -> DecodeResult<Vec<u64>> {
    decode_base128_groups(content, path)
}

fn decode_base128_groups(content: &[u8], path: &str) -> DecodeResult<Vec<u64>> {
    let mut groups = Vec::new();
    let mut value: u64 = 0;
    for byte in content {
        value = value
            .checked_shl(7)
            .and_then(|v| v.checked_add((byte & 0x7F) as u64))
            .ok_or_else(|| DecodeError::new(path, 0, "object identifier arc overflow"))?;
        if byte & 0x80 == 0 {
            groups.push(value);
            value = 0;
        }
    }
    if value != 0 {
        return Err(DecodeError::new(path, content.len(), "truncated object identifier arc"));
    }
    Ok(groups)
}

/// Character-string octet encodings per type (X.690 clause 8.23). Most
/// kinds are restricted-alphabet single-byte encodings we pass through
/// as Latin-1; UTF8String is UTF-8; BMPString/UniversalString are
/// fixed-width big-endian code units.
pub fn encode_character_string(kind: &TypeKind, s: &str) -> Vec<u8> {
    match kind {
        TypeKind::BmpString => s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect(),
        TypeKind::UniversalString => s.chars().flat_map(|c| (c as u32).to_be_bytes()).collect(),
        TypeKind::Utf8String | TypeKind::CharacterString => s.as_bytes().to_vec(),
        _ => s.chars().map(|c| c as u8).collect(),
    }
}

pub fn decode_character_string(kind: &TypeKind, content: &[u8], path: &str) -> DecodeResult<String> {
    match kind {
        TypeKind::BmpString => {
            if content.len() % 2 != 0 {
                return Err(DecodeError::new(path, content.len(), "odd-length BMPString"));
            }
            let units: Vec<u16> = content
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).map_err(|e| DecodeError::new(path, 0, e.to_string()))
        }
        TypeKind::UniversalString => {
            if content.len() % 4 != 0 {
                return Err(DecodeError::new(path, content.len(), "non-multiple-of-4-length UniversalString"));
            }
            content
                .chunks_exact(4)
                .map(|c| {
                    let code = u32::from_be_bytes([c[0], c[1], c[2], c[3]]);
                    char::from_u32(code).ok_or_else(|| DecodeError::new(path, 0, "invalid UniversalString code point"))
                })
                .collect()
        }
        TypeKind::Utf8String | TypeKind::CharacterString => {
            String::from_utf8(content.to_vec()).map_err(|e| DecodeError::new(path, 0, e.to_string()))
        }
        _ => Ok(content.iter().map(|b| *b as char).collect()),
    }
}
