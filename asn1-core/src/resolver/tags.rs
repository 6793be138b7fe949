//! Tag computation: surface EXPLICIT/IMPLICIT/AUTOMATIC rules reduced to
//! one effective [`Tag`] per resolved type, per X.680 clause 8.

use crate::ast::{BuiltinType, RawTag, TagClass as RawTagClass, TagMode as RawTagMode, TaggingDefault};
use crate::error::ResolveError;
use crate::model::{Tag, TagClass, TagMode, TypeKind};

pub fn universal_tag_for_builtin(b: BuiltinType) -> Tag {
    use BuiltinType::*;
    let number = match b {
        Boolean => Tag::BOOLEAN,
        Integer => Tag::INTEGER,
        Real => Tag::REAL,
        Null => Tag::NULL,
        BitString => Tag::BIT_STRING,
        OctetString => Tag::OCTET_STRING,
        ObjectIdentifier => Tag::OBJECT_IDENTIFIER,
        RelativeOid => Tag::RELATIVE_OID,
        Utf8String => Tag::UTF8_STRING,
        Ia5String => Tag::IA5_STRING,
        PrintableString => Tag::PRINTABLE_STRING,
        NumericString => Tag::NUMERIC_STRING,
        VisibleString => Tag::VISIBLE_STRING,
        GeneralString => Tag::GENERAL_STRING,
        BmpString => Tag::BMP_STRING,
        UniversalString => Tag::UNIVERSAL_STRING,
        TeletexString => Tag::TELETEX_STRING,
        GraphicString => Tag::GRAPHIC_STRING,
        UtcTime => Tag::UTC_TIME,
        GeneralizedTime => Tag::GENERALIZED_TIME,
        Date => Tag::DATE,
        TimeOfDay => Tag::TIME_OF_DAY,
        DateTime => Tag::DATE_TIME,
        Duration => Tag::DURATION,
        ObjectDescriptor => Tag::OBJECT_DESCRIPTOR,
        External => Tag::EXTERNAL,
        EmbeddedPdv => Tag::EMBEDDED_PDV,
        CharacterString => Tag::CHARACTER_STRING,
        OpenType => 0,
    };
    Tag::universal(number)
}

pub fn class_of(c: RawTagClass) -> TagClass {
    match c {
        RawTagClass::Universal => TagClass::Universal,
        RawTagClass::Application => TagClass::Application,
        RawTagClass::ContextSpecific => TagClass::ContextSpecific,
        RawTagClass::Private => TagClass::Private,
    }
}

/// Whether a type kind may never be IMPLICITly re-tagged: CHOICE has no
/// single tag to replace, and the open types carry their tag at runtime.
fn forbids_implicit(kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Choice { .. } | TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType
    )
}

/// Computes the effective tag for an explicitly written `[class number]
/// mode inner` tagged type, given the already-resolved inner type's own
/// tag and kind.
pub fn effective_tag(
    raw_tag: RawTag,
    mode: Option<RawTagMode>,
    default: TaggingDefault,
    inner_kind: &TypeKind,
    path: &str,
) -> Result<Tag, ResolveError> {
    let class = class_of(raw_tag.class);
    let resolved_mode = match mode {
        Some(RawTagMode::Explicit) => TagMode::Explicit,
        Some(RawTagMode::Implicit) => TagMode::Implicit,
        None => match default {
            TaggingDefault::Explicit => TagMode::Explicit,
            TaggingDefault::Implicit => TagMode::Implicit,
            // Automatic tagging falls back to EXPLICIT wherever IMPLICIT
            // would be illegal, rather than erroring.
            TaggingDefault::Automatic => {
                if forbids_implicit(inner_kind) {
                    TagMode::Explicit
                } else {
                    TagMode::Implicit
                }
            }
        },
    };

    if resolved_mode == TagMode::Implicit && forbids_implicit(inner_kind) {
        return Err(ResolveError::IllegalChoiceTag {
            path: path.to_string(),
        });
    }

    Ok(Tag {
        class,
        number: raw_tag.number,
        mode: resolved_mode,
    })
}

/// Whether automatic tagging applies to a component list: only when none
/// of the components already carries an explicit `[n]` tag (X.680
/// clause 8.4: AUTOMATIC TAGS has no effect once any component is
/// explicitly tagged).
pub fn should_auto_tag(default: TaggingDefault, any_component_tagged: bool) -> bool {
    default == TaggingDefault::Automatic && !any_component_tagged
}
