//! Subtype constraint grammar: `(a..b)`, `SIZE(...)`, `FROM(...)`,
//! `PATTERN`, unions/intersections, `ALL EXCEPT`, extensible constraints,
//! and `WITH COMPONENTS`.

use super::cursor::Cursor;
use super::values::parse_value;
use crate::ast::{Constraint, PermittedAlphabet, Presence, RangeBound, ValueRange};
use crate::error::ParseResult;

/// Parses a parenthesized constraint: `( <element-set-spec> )`.
pub fn parse_constraint(cur: &mut Cursor) -> ParseResult<Constraint> {
    cur.eat_punct("(")?;
    let c = parse_element_set(cur)?;
    cur.eat_punct(")")?;
    Ok(c)
}

/// `<intersection> ( "|" <intersection> )*` with a trailing `, ...`
/// marking the whole set extensible.
fn parse_element_set(cur: &mut Cursor) -> ParseResult<Constraint> {
    let mut lhs = parse_intersection(cur)?;
    loop {
        if cur.try_eat_punct("|") || cur.try_eat_reserved("UNION") {
            let rhs = parse_intersection(cur)?;
            lhs = Constraint::Union(Box::new(lhs), Box::new(rhs));
        } else {
            break;
        }
    }
    if cur.try_eat_punct(",") {
        cur.eat_punct("...")?;
        lhs = Constraint::Extensible(Box::new(lhs));
    }
    Ok(lhs)
}

fn parse_intersection(cur: &mut Cursor) -> ParseResult<Constraint> {
    let mut lhs = parse_element(cur)?;
    loop {
        if cur.try_eat_punct("^") || cur.try_eat_reserved("INTERSECTION") {
            let rhs = parse_element(cur)?;
            lhs = Constraint::Intersection(Box::new(lhs), Box::new(rhs));
        } else {
            break;
        }
    }
    Ok(lhs)
}

fn parse_element(cur: &mut Cursor) -> ParseResult<Constraint> {
    if cur.try_eat_reserved("ALL") {
        cur.eat_reserved("EXCEPT")?;
        let inner = parse_element(cur)?;
        return Ok(Constraint::AllExcept(Box::new(inner)));
    }
    if cur.try_eat_reserved("SIZE") {
        let inner = parse_constraint(cur)?;
        return Ok(Constraint::Size(Box::new(inner)));
    }
    if cur.try_eat_reserved("FROM") {
        cur.eat_punct("(")?;
        let alphabet = parse_permitted_alphabet(cur)?;
        cur.eat_punct(")")?;
        return Ok(Constraint::From(alphabet));
    }
    if cur.try_eat_reserved("PATTERN") {
        let pattern = cur.eat_cstring()?;
        return Ok(Constraint::Pattern(pattern));
    }
    if cur.try_eat_reserved("CONTAINING") {
        let inner = super::types::parse_type(cur)?;
        return Ok(Constraint::Containing(Box::new(inner)));
    }
    if cur.try_eat_reserved("WITH") {
        cur.eat_reserved("COMPONENTS")?;
        cur.eat_punct("{")?;
        let mut comps = Vec::new();
        loop {
            if cur.is_punct("...") {
                cur.advance();
            } else {
                let name = cur.eat_value_reference()?;
                let presence = if cur.try_eat_reserved("PRESENT") {
                    Presence::Present
                } else if cur.try_eat_reserved("ABSENT") {
                    Presence::Absent
                } else {
                    Presence::Present
                };
                comps.push((name, presence));
            }
            if !cur.try_eat_punct(",") {
                break;
            }
        }
        cur.eat_punct("}")?;
        return Ok(Constraint::WithComponents(comps));
    }
    if cur.is_punct("(") {
        return parse_constraint(cur);
    }
    // A bare value range or single value.
    let lo = parse_range_bound(cur)?;
    if cur.try_eat_punct("..") {
        let hi = parse_range_bound(cur)?;
        return Ok(Constraint::Value(ValueRange { lo, hi }));
    }
    match lo {
        RangeBound::Value(v) => Ok(Constraint::Single(v)),
        _ => Ok(Constraint::Value(ValueRange {
            lo: lo.clone(),
            hi: lo,
        })),
    }
}

fn parse_range_bound(cur: &mut Cursor) -> ParseResult<RangeBound> {
    if cur.try_eat_reserved("MIN") {
        return Ok(RangeBound::Min);
    }
    if cur.try_eat_reserved("MAX") {
        return Ok(RangeBound::Max);
    }
    Ok(RangeBound::Value(parse_value(cur)?))
}

fn parse_permitted_alphabet(cur: &mut Cursor) -> ParseResult<PermittedAlphabet> {
    let mut lhs = parse_permitted_alphabet_element(cur)?;
    while cur.try_eat_punct("|") || cur.try_eat_reserved("UNION") {
        let rhs = parse_permitted_alphabet_element(cur)?;
        lhs = PermittedAlphabet::Union(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_permitted_alphabet_element(cur: &mut Cursor) -> ParseResult<PermittedAlphabet> {
    if matches!(cur.peek().kind, crate::lexer::TokenKind::CString(_)) {
        return Ok(PermittedAlphabet::String(cur.eat_cstring()?));
    }
    let lo = parse_range_bound(cur)?;
    if cur.try_eat_punct("..") {
        let hi = parse_range_bound(cur)?;
        return Ok(PermittedAlphabet::Range(ValueRange { lo, hi }));
    }
    Ok(PermittedAlphabet::Range(ValueRange {
        lo: lo.clone(),
        hi: lo,
    }))
}
