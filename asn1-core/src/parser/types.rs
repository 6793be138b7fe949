//! Type grammar: builtin types, CHOICE/SEQUENCE/SET (with extension
//! markers and version brackets), SEQUENCE OF/SET OF, tagged types, and
//! type references (including `TypeRef.&field`).

use super::constraints::parse_constraint;
use super::cursor::Cursor;
use crate::ast::{
    BuiltinType, Constraint, EnumItem, ExtensionMarker, RawComponent, RawTag, RawType, TagClass,
    TagMode,
};
use crate::error::ParseResult;
use crate::lexer::TokenKind;

pub fn parse_type(cur: &mut Cursor) -> ParseResult<RawType> {
    let base = parse_unconstrained_type(cur)?;
    let mut constraints = Vec::new();
    while cur.is_punct("(") {
        constraints.push(parse_constraint(cur)?);
    }
    if constraints.is_empty() {
        Ok(base)
    } else {
        Ok(wrap_with_constraints(base, constraints))
    }
}

/// SEQUENCE OF/SET OF attach their size constraint directly to the
/// element-of wrapper rather than via `Constrained`, so a separate
/// helper is used when that shape is already known.
fn wrap_with_constraints(base: RawType, constraints: Vec<Constraint>) -> RawType {
    match base {
        RawType::SequenceOf(elem, mut existing) => {
            existing.extend(constraints);
            RawType::SequenceOf(elem, existing)
        }
        RawType::SetOf(elem, mut existing) => {
            existing.extend(constraints);
            RawType::SetOf(elem, existing)
        }
        other => RawType::Constrained(Box::new(other), constraints),
    }
}

fn parse_unconstrained_type(cur: &mut Cursor) -> ParseResult<RawType> {
    if cur.is_punct("[") {
        return parse_tagged_type(cur);
    }
    if cur.try_eat_reserved("BOOLEAN") {
        return Ok(RawType::Builtin(BuiltinType::Boolean));
    }
    if cur.try_eat_reserved("INTEGER") {
        if cur.is_punct("{") {
            skip_named_number_list(cur)?;
        }
        return Ok(RawType::Builtin(BuiltinType::Integer));
    }
    if cur.try_eat_reserved("REAL") {
        return Ok(RawType::Builtin(BuiltinType::Real));
    }
    if cur.try_eat_reserved("NULL") {
        return Ok(RawType::Builtin(BuiltinType::Null));
    }
    if cur.try_eat_reserved("BIT") {
        cur.eat_reserved("STRING")?;
        if cur.is_punct("{") {
            skip_named_number_list(cur)?;
        }
        return Ok(RawType::Builtin(BuiltinType::BitString));
    }
    if cur.try_eat_reserved("OCTET") {
        cur.eat_reserved("STRING")?;
        return Ok(RawType::Builtin(BuiltinType::OctetString));
    }
    if cur.try_eat_reserved("OBJECT") {
        cur.eat_reserved("IDENTIFIER")?;
        return Ok(RawType::Builtin(BuiltinType::ObjectIdentifier));
    }
    if cur.try_eat_reserved("RELATIVE-OID") {
        return Ok(RawType::Builtin(BuiltinType::RelativeOid));
    }
    if cur.try_eat_reserved("ENUMERATED") {
        let (items, extensible) = parse_enum_items(cur)?;
        return Ok(RawType::Enumerated(items, extensible));
    }
    if cur.try_eat_reserved("UTF8String") {
        return Ok(RawType::Builtin(BuiltinType::Utf8String));
    }
    if cur.try_eat_reserved("IA5String") {
        return Ok(RawType::Builtin(BuiltinType::Ia5String));
    }
    if cur.try_eat_reserved("PrintableString") {
        return Ok(RawType::Builtin(BuiltinType::PrintableString));
    }
    if cur.try_eat_reserved("NumericString") {
        return Ok(RawType::Builtin(BuiltinType::NumericString));
    }
    if cur.try_eat_reserved("VisibleString") || cur.try_eat_reserved("ISO646String") {
        return Ok(RawType::Builtin(BuiltinType::VisibleString));
    }
    if cur.try_eat_reserved("GeneralString") {
        return Ok(RawType::Builtin(BuiltinType::GeneralString));
    }
    if cur.try_eat_reserved("BMPString") {
        return Ok(RawType::Builtin(BuiltinType::BmpString));
    }
    if cur.try_eat_reserved("UniversalString") {
        return Ok(RawType::Builtin(BuiltinType::UniversalString));
    }
    if cur.try_eat_reserved("TeletexString") || cur.try_eat_reserved("T61String") {
        return Ok(RawType::Builtin(BuiltinType::TeletexString));
    }
    if cur.try_eat_reserved("GraphicString") || cur.try_eat_reserved("VideotexString") {
        return Ok(RawType::Builtin(BuiltinType::GraphicString));
    }
    if cur.try_eat_reserved("UTCTime") {
        return Ok(RawType::Builtin(BuiltinType::UtcTime));
    }
    if cur.try_eat_reserved("GeneralizedTime") {
        return Ok(RawType::Builtin(BuiltinType::GeneralizedTime));
    }
    if cur.try_eat_reserved("DATE-TIME") {
        return Ok(RawType::Builtin(BuiltinType::DateTime));
    }
    if cur.try_eat_reserved("DATE") {
        return Ok(RawType::Builtin(BuiltinType::Date));
    }
    if cur.try_eat_reserved("TIME-OF-DAY") {
        return Ok(RawType::Builtin(BuiltinType::TimeOfDay));
    }
    if cur.try_eat_reserved("DURATION") {
        return Ok(RawType::Builtin(BuiltinType::Duration));
    }
    if cur.try_eat_reserved("ObjectDescriptor") {
        return Ok(RawType::Builtin(BuiltinType::ObjectDescriptor));
    }
    if cur.try_eat_reserved("EXTERNAL") {
        return Ok(RawType::Builtin(BuiltinType::External));
    }
    if cur.try_eat_reserved("EMBEDDED") {
        cur.eat_reserved("PDV")?;
        return Ok(RawType::Builtin(BuiltinType::EmbeddedPdv));
    }
    if cur.try_eat_reserved("CHARACTER") {
        cur.eat_reserved("STRING")?;
        return Ok(RawType::Builtin(BuiltinType::CharacterString));
    }
    if cur.is_reserved("CHOICE") {
        cur.advance();
        let (comps, ext) = parse_component_list(cur)?;
        return Ok(RawType::Choice(comps, ext));
    }
    if cur.is_reserved("SEQUENCE") {
        return parse_sequence_or_set(cur, true);
    }
    if cur.is_reserved("SET") {
        return parse_sequence_or_set(cur, false);
    }
    if cur.try_eat_reserved("ANY") {
        if cur.try_eat_reserved("DEFINED") {
            cur.eat_reserved("BY")?;
            let field = cur.eat_value_reference()?;
            return Ok(RawType::AnyDefinedBy(field));
        }
        return Ok(RawType::Any);
    }

    // `TypeRef` or `TypeRef.&field` or `Module.TypeRef`.
    if matches!(cur.peek().kind, TokenKind::TypeReference) {
        let first = cur.eat_type_reference()?;
        if cur.try_eat_punct(".") {
            if cur.try_eat_punct("&") {
                let field = cur.eat_type_reference().or_else(|_| cur.eat_value_reference())?;
                return Ok(RawType::FieldReference { base: first, field });
            }
            let name = cur.eat_type_reference()?;
            return Ok(RawType::Reference {
                module: Some(first),
                name,
            });
        }
        return Ok(RawType::Reference {
            module: None,
            name: first,
        });
    }
    if cur.try_eat_punct("@") {
        // `@.field` / `@field` constrained-by value reference, used only
        // inside constraints on open types; surface it as a reference so
        // the resolver can special-case it.
        cur.try_eat_punct(".");
        let field = cur.eat_value_reference()?;
        return Ok(RawType::FieldReference {
            base: "@".to_string(),
            field,
        });
    }

    Err(cur.unexpected("type"))
}

fn parse_sequence_or_set(cur: &mut Cursor, is_sequence: bool) -> ParseResult<RawType> {
    cur.advance(); // SEQUENCE | SET
    if cur.try_eat_reserved("OF") {
        let elem = parse_type(cur)?;
        return Ok(if is_sequence {
            RawType::SequenceOf(Box::new(elem), Vec::new())
        } else {
            RawType::SetOf(Box::new(elem), Vec::new())
        });
    }
    let (comps, ext) = parse_component_list(cur)?;
    Ok(if is_sequence {
        RawType::Sequence(comps, ext)
    } else {
        RawType::Set(comps, ext)
    })
}

/// Parses the `{ comp, comp, ..., [[1: extra]] }` component list shared
/// by CHOICE/SEQUENCE/SET.
fn parse_component_list(
    cur: &mut Cursor,
) -> ParseResult<(Vec<RawComponent>, Option<ExtensionMarker>)> {
    cur.eat_punct("{")?;
    let mut comps = Vec::new();
    let mut ext = None;
    let mut group: Option<u32> = None;
    let mut in_extension = false;

    if cur.is_punct("}") {
        cur.advance();
        return Ok((comps, ext));
    }

    loop {
        if cur.is_punct("...") {
            cur.advance();
            ext = Some(ExtensionMarker {
                after_component: comps.len(),
            });
            in_extension = true;
        } else if cur.is_punct("[[") {
            cur.advance();
            let g = cur.eat_integer()? as u32;
            cur.eat_punct(":")?;
            group = Some(g);
        } else if cur.is_punct("]]") {
            cur.advance();
            group = None;
        } else {
            let mut comp = parse_component(cur)?;
            comp.is_extension_addition = in_extension;
            comp.group = group;
            comps.push(comp);
        }
        if !cur.try_eat_punct(",") {
            break;
        }
    }
    cur.eat_punct("}")?;
    Ok((comps, ext))
}

fn parse_component(cur: &mut Cursor) -> ParseResult<RawComponent> {
    if cur.is_punct("[[") || cur.is_punct("]]") {
        // Shouldn't happen; handled by the caller, but keep this guard
        // so a malformed bracket inside a component list fails clearly.
        return Err(cur.unexpected("component"));
    }
    let name = cur.eat_value_reference()?;
    let ty = parse_type(cur)?;
    let mut optional = false;
    let mut default = None;
    if cur.try_eat_reserved("OPTIONAL") {
        optional = true;
    } else if cur.try_eat_reserved("DEFAULT") {
        default = Some(super::values::parse_value(cur)?);
    }
    Ok(RawComponent {
        name,
        ty,
        optional,
        default,
        group: None,
        is_extension_addition: false,
    })
}

fn parse_tagged_type(cur: &mut Cursor) -> ParseResult<RawType> {
    cur.eat_punct("[")?;
    let class = if cur.try_eat_reserved("UNIVERSAL") {
        TagClass::Universal
    } else if cur.try_eat_reserved("APPLICATION") {
        TagClass::Application
    } else if cur.try_eat_reserved("PRIVATE") {
        TagClass::Private
    } else {
        TagClass::ContextSpecific
    };
    let number = cur.eat_integer()? as u32;
    cur.eat_punct("]")?;
    let mode = if cur.try_eat_reserved("IMPLICIT") {
        Some(TagMode::Implicit)
    } else if cur.try_eat_reserved("EXPLICIT") {
        Some(TagMode::Explicit)
    } else {
        None
    };
    let inner = parse_type(cur)?;
    Ok(RawType::Tagged {
        tag: RawTag { class, number },
        mode,
        inner: Box::new(inner),
    })
}

/// `ENUMERATED { a(0), b(1), ..., c(2) }`: captures names and values,
/// assigning successive values to entries that omit an explicit one, per
/// X.680 clause 20.
fn parse_enum_items(cur: &mut Cursor) -> ParseResult<(Vec<EnumItem>, bool)> {
    cur.eat_punct("{")?;
    let mut items = Vec::new();
    let mut extensible = false;
    let mut next_value: i128 = 0;
    loop {
        if cur.is_punct("...") {
            cur.advance();
            extensible = true;
        } else {
            let name = cur.eat_value_reference()?;
            let value = if cur.try_eat_punct("(") {
                let v = cur.eat_integer()?;
                cur.eat_punct(")")?;
                v
            } else {
                next_value
            };
            next_value = value + 1;
            items.push(EnumItem { name, value });
        }
        if !cur.try_eat_punct(",") {
            break;
        }
    }
    cur.eat_punct("}")?;
    Ok((items, extensible))
}

/// `INTEGER { a(1), b(2) }` / `BIT STRING { a(0), b(1) }` named-number
/// lists act as symbolic constants for values of the underlying type, not
/// as a distinct type; they are skipped at the grammar level since
/// neither carries named-number data in the type model (unlike
/// ENUMERATED, whose names and values select the encoded representation
/// itself).
fn skip_named_number_list(cur: &mut Cursor) -> ParseResult<()> {
    if !cur.try_eat_punct("{") {
        return Ok(());
    }
    let mut depth = 1usize;
    while depth > 0 {
        if cur.is_punct("{") {
            depth += 1;
        } else if cur.is_punct("}") {
            depth -= 1;
        }
        if cur.at_eof() && depth > 0 {
            return Err(cur.unexpected("}"));
        }
        cur.advance();
    }
    Ok(())
}
