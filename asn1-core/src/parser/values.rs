//! Value-notation parsing, used for constant values in constraints,
//! DEFAULTs, and value assignments. This is not a general executable
//! value-notation evaluator (spec non-goal); it recognizes the literal
//! forms needed to drive encode/decode and constraint evaluation.

use super::cursor::Cursor;
use crate::ast::{ObjIdComponent, RawValue};
use crate::error::ParseResult;
use crate::lexer::TokenKind;

pub fn parse_value(cur: &mut Cursor) -> ParseResult<RawValue> {
    if cur.try_eat_reserved("TRUE") {
        return Ok(RawValue::Boolean(true));
    }
    if cur.try_eat_reserved("FALSE") {
        return Ok(RawValue::Boolean(false));
    }
    if cur.try_eat_reserved("NULL") {
        return Ok(RawValue::Null);
    }
    if cur.try_eat_reserved("MIN") {
        return Ok(RawValue::Min);
    }
    if cur.try_eat_reserved("MAX") {
        return Ok(RawValue::Max);
    }

    match cur.peek().kind.clone() {
        TokenKind::Integer(_) => Ok(RawValue::Integer(cur.eat_integer()?)),
        TokenKind::CString(_) => Ok(RawValue::CString(cur.eat_cstring()?)),
        TokenKind::Binary(bits) => {
            cur.advance();
            Ok(RawValue::BitString(bits))
        }
        TokenKind::Hex(bytes) => {
            cur.advance();
            Ok(RawValue::OctetString(bytes))
        }
        TokenKind::ValueReference => {
            let name = cur.eat_value_reference()?;
            if cur.is_punct("{") {
                // either a SEQUENCE value `{ a 1, b TRUE }` following a
                // lowercase-started value reference is not legal ASN.1,
                // but an OID-like braced list `{ iso member-body(2) 1 }`
                // can start from a lowercase reference as the first arc.
                return parse_oid_or_braced(cur, Some(name));
            }
            Ok(RawValue::Reference(name))
        }
        TokenKind::TypeReference => {
            // `ChoiceAlt : value` is written `identifier : value` in real
            // grammar (field names are lowercase); a bare type reference
            // here is a reference to a named value-set/object.
            let name = cur.eat_type_reference()?;
            Ok(RawValue::Reference(name))
        }
        TokenKind::Punctuation if cur.is_punct("{") => parse_oid_or_braced(cur, None),
        TokenKind::Punctuation if cur.is_punct("-") => {
            cur.advance();
            let v = parse_value(cur)?;
            match v {
                RawValue::Integer(i) => Ok(RawValue::Integer(-i)),
                RawValue::Real(r) => Ok(RawValue::Real(-r)),
                other => Ok(other),
            }
        }
        _ => Err(cur.unexpected("value")),
    }
}

/// Parses `{ ... }`, disambiguating between an OBJECT IDENTIFIER value
/// (a list of bare/named/numbered arcs), a SEQUENCE value (`field value,
/// ...`), and a SEQUENCE OF value (comma-separated values) by looking
/// ahead at the shape of the first element.
fn parse_oid_or_braced(cur: &mut Cursor, leading: Option<String>) -> ParseResult<RawValue> {
    cur.eat_punct("{")?;
    if cur.is_punct("}") {
        cur.advance();
        return Ok(RawValue::SequenceOf(Vec::new()));
    }

    // Look for the OID-arc shape: `name(number)` or a bare number/name,
    // repeated with no commas. If we instead see a comma or a
    // `field value` pair, fall back to structured parsing.
    if looks_like_oid_arc(cur) && leading.is_none() {
        let mut arcs = Vec::new();
        loop {
            arcs.push(parse_oid_component(cur)?);
            if cur.is_punct("}") {
                break;
            }
        }
        cur.eat_punct("}")?;
        return Ok(RawValue::ObjectIdentifier(arcs));
    }

    // `field value, field value, ...` (SEQUENCE value notation) vs
    // a bare comma-separated value list (SEQUENCE OF).
    let mut first_is_field = false;
    if matches!(cur.peek().kind, TokenKind::ValueReference) {
        let save = cur.position();
        let name = cur.eat_value_reference()?;
        if !cur.is_punct(",") && !cur.is_punct("}") {
            first_is_field = true;
            let value = parse_value(cur)?;
            let mut fields = vec![(name, value)];
            while cur.try_eat_punct(",") {
                let fname = cur.eat_value_reference()?;
                let fval = parse_value(cur)?;
                fields.push((fname, fval));
            }
            cur.eat_punct("}")?;
            return Ok(RawValue::Sequence(fields));
        }
        let _ = save;
        let mut values = vec![RawValue::Reference(name)];
        while cur.try_eat_punct(",") {
            values.push(parse_value(cur)?);
        }
        cur.eat_punct("}")?;
        return Ok(RawValue::SequenceOf(values));
    }

    let mut values = Vec::new();
    if !cur.is_punct("}") {
        values.push(parse_value(cur)?);
        while cur.try_eat_punct(",") {
            values.push(parse_value(cur)?);
        }
    }
    cur.eat_punct("}")?;
    let _ = first_is_field;
    Ok(RawValue::SequenceOf(values))
}

fn looks_like_oid_arc(cur: &Cursor) -> bool {
    match cur.peek().kind {
        TokenKind::Integer(_) => true,
        TokenKind::ValueReference => matches!(cur.peek_n(1).kind, TokenKind::Punctuation)
            && cur.peek_n(1).lexeme == "("
            || !matches!(cur.peek_n(1).kind, TokenKind::Punctuation)
            || cur.peek_n(1).lexeme == "}",
        _ => false,
    }
}

pub(super) fn parse_oid_component(cur: &mut Cursor) -> ParseResult<ObjIdComponent> {
    match cur.peek().kind.clone() {
        TokenKind::Integer(v) => {
            cur.advance();
            Ok(ObjIdComponent::Numeric(v as u64))
        }
        TokenKind::ValueReference => {
            let name = cur.eat_value_reference()?;
            if cur.try_eat_punct("(") {
                let num = cur.eat_integer()?;
                cur.eat_punct(")")?;
                Ok(ObjIdComponent::Named(name, num as u64))
            } else {
                Ok(ObjIdComponent::NameOnly(name))
            }
        }
        _ => Err(cur.unexpected("object identifier component")),
    }
}
