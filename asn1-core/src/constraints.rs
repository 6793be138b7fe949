//! The constraint engine (C5): reduces parsed constraint expressions to a
//! canonical root-plus-extension form over three domains (value, size,
//! permitted-alphabet), and answers the questions PER framing needs
//! (extensible? finite root? bounds? minimum bit-width?) without
//! consulting runtime values.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::ast::{self, Constraint as RawConstraint, RangeBound, ValueRange};
use crate::error::{ConstraintError, ConstraintResult};

/// An interval with possibly-infinite endpoints, over arbitrary-precision
/// integers so size/value constraints on INTEGER are never truncated by
/// the host's native integer width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    NegInfinity,
    PosInfinity,
    Finite(BigInt),
}

impl Interval {
    pub fn unbounded() -> Self {
        Self {
            lo: Bound::NegInfinity,
            hi: Bound::PosInfinity,
        }
    }

    pub fn closed(lo: i128, hi: i128) -> Self {
        Self {
            lo: Bound::Finite(BigInt::from(lo)),
            hi: Bound::Finite(BigInt::from(hi)),
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self.lo, Bound::Finite(_)) && matches!(self.hi, Bound::Finite(_))
    }

    /// Intersects two intervals; returns `None` if the intersection is
    /// empty.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lo = bound_max(&self.lo, &other.lo);
        let hi = bound_min(&self.hi, &other.hi);
        if let (Bound::Finite(l), Bound::Finite(h)) = (&lo, &hi) {
            if l > h {
                return None;
            }
        }
        Some(Interval { lo, hi })
    }

    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            lo: bound_min(&self.lo, &other.lo),
            hi: bound_max(&self.hi, &other.hi),
        }
    }

    /// Number of bits needed to represent every value in a finite,
    /// non-negative-width range: `ceil(log2(hi - lo + 1))`, per X.691
    /// clause 10.5 (constrained whole number encoding).
    pub fn bit_width(&self) -> Option<u32> {
        match (&self.lo, &self.hi) {
            (Bound::Finite(lo), Bound::Finite(hi)) => {
                let range = hi - lo;
                if range.is_zero() {
                    return Some(0);
                }
                let count = &range + BigInt::from(1);
                Some(bits_for_count(&count))
            }
            _ => None,
        }
    }
}

fn bits_for_count(count: &BigInt) -> u32 {
    let mut n = count - BigInt::from(1);
    let mut bits = 0u32;
    while n > BigInt::zero() {
        n >>= 1;
        bits += 1;
    }
    bits
}

fn bound_max<'a>(a: &'a Bound, b: &'a Bound) -> Bound {
    match (a, b) {
        (Bound::NegInfinity, other) | (other, Bound::NegInfinity) => other.clone(),
        (Bound::PosInfinity, _) | (_, Bound::PosInfinity) => Bound::PosInfinity,
        (Bound::Finite(x), Bound::Finite(y)) => Bound::Finite(x.max(y).clone()),
    }
}

fn bound_min<'a>(a: &'a Bound, b: &'a Bound) -> Bound {
    match (a, b) {
        (Bound::PosInfinity, other) | (other, Bound::PosInfinity) => other.clone(),
        (Bound::NegInfinity, _) | (_, Bound::NegInfinity) => Bound::NegInfinity,
        (Bound::Finite(x), Bound::Finite(y)) => Bound::Finite(x.min(y).clone()),
    }
}

/// A permitted-alphabet constraint reduced to a sorted set of allowed
/// Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlphabetMask {
    pub code_points: Vec<(u32, u32)>,
}

impl AlphabetMask {
    pub fn allows(&self, c: char) -> bool {
        let cp = c as u32;
        self.code_points.iter().any(|&(lo, hi)| lo <= cp && cp <= hi)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.code_points.is_empty()
    }
}

/// The canonical, codec-ready form of every constraint attached to a
/// type: a root set (used for the common/extension-free case) and,
/// when the constraint is extensible, a separate extension set that
/// widens it without changing the root's encoding.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub value_root: Option<Interval>,
    pub value_extension: Option<Interval>,
    pub size_root: Option<Interval>,
    pub size_extension: Option<Interval>,
    pub alphabet: Option<AlphabetMask>,
    pub pattern: Option<String>,
    pub extensible: bool,
}

impl Constraints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.value_root.is_none() && self.size_root.is_none() && self.alphabet.is_none()
    }

    /// PER question: is the value range finite (required to use the
    /// constrained/semi-constrained INTEGER encodings instead of the
    /// unconstrained length-prefixed form)?
    pub fn value_is_finite_root(&self) -> bool {
        self.value_root.as_ref().is_some_and(Interval::is_finite)
    }

    pub fn value_bit_width(&self) -> Option<u32> {
        self.value_root.as_ref().and_then(Interval::bit_width)
    }

    pub fn size_is_finite_root(&self) -> bool {
        self.size_root.as_ref().is_some_and(Interval::is_finite)
    }

    pub fn size_bit_width(&self) -> Option<u32> {
        self.size_root.as_ref().and_then(Interval::bit_width)
    }

    /// Intersects this constraint set with another (component-wise on
    /// the dimensions each touches), as the resolver does when an inner
    /// type's own constraint composes with an outer one reapplying it.
    pub fn intersect(&self, other: &Constraints) -> ConstraintResult<Constraints> {
        let value_root = intersect_opt(&self.value_root, &other.value_root, "value")?;
        let size_root = intersect_opt(&self.size_root, &other.size_root, "size")?;
        Ok(Constraints {
            value_root,
            value_extension: self.value_extension.clone().or_else(|| other.value_extension.clone()),
            size_root,
            size_extension: self.size_extension.clone().or_else(|| other.size_extension.clone()),
            alphabet: self.alphabet.clone().or_else(|| other.alphabet.clone()),
            pattern: self.pattern.clone().or_else(|| other.pattern.clone()),
            extensible: self.extensible || other.extensible,
        })
    }
}

fn intersect_opt(
    a: &Option<Interval>,
    b: &Option<Interval>,
    domain: &str,
) -> ConstraintResult<Option<Interval>> {
    match (a, b) {
        (Some(a), Some(b)) => match a.intersect(b) {
            Some(i) => Ok(Some(i)),
            None => Err(ConstraintError::EmptyIntersection {
                path: String::new(),
                detail: format!("{domain} constraint intersection is empty"),
            }),
        },
        (Some(a), None) => Ok(Some(a.clone())),
        (None, Some(b)) => Ok(Some(b.clone())),
        (None, None) => Ok(None),
    }
}

/// Reduces a list of raw, surface-syntax constraints (as ASN.1 allows
/// several `(...)` constraints to apply to one type in sequence, each
/// intersected with the rest) to canonical form.
pub fn reduce_constraints(raw: &[RawConstraint], path: &str) -> ConstraintResult<Constraints> {
    let mut out = Constraints::none();
    for c in raw {
        let reduced = reduce_one(c, path)?;
        out = out.intersect(&reduced)?;
    }
    Ok(out)
}

fn reduce_one(c: &RawConstraint, path: &str) -> ConstraintResult<Constraints> {
    match c {
        RawConstraint::Value(range) => {
            let interval = interval_of(range)?;
            Ok(Constraints {
                value_root: Some(interval),
                ..Constraints::none()
            })
        }
        RawConstraint::Single(v) => {
            let n = value_as_bigint(v).ok_or_else(|| ConstraintError::DomainMismatch {
                path: path.to_string(),
                detail: "single-value constraint is not numeric".to_string(),
            })?;
            Ok(Constraints {
                value_root: Some(Interval {
                    lo: Bound::Finite(n.clone()),
                    hi: Bound::Finite(n),
                }),
                ..Constraints::none()
            })
        }
        RawConstraint::Size(inner) => {
            let reduced = reduce_one(inner, path)?;
            Ok(Constraints {
                size_root: reduced.value_root.or(reduced.size_root),
                size_extension: reduced.value_extension.or(reduced.size_extension),
                extensible: reduced.extensible,
                ..Constraints::none()
            })
        }
        RawConstraint::From(alphabet) => Ok(Constraints {
            alphabet: Some(alphabet_mask(alphabet)),
            ..Constraints::none()
        }),
        RawConstraint::Pattern(p) => Ok(Constraints {
            pattern: Some(p.clone()),
            ..Constraints::none()
        }),
        RawConstraint::Union(a, b) => {
            let a = reduce_one(a, path)?;
            let b = reduce_one(b, path)?;
            Ok(Constraints {
                value_root: union_opt(&a.value_root, &b.value_root),
                size_root: union_opt(&a.size_root, &b.size_root),
                alphabet: union_alphabet(&a.alphabet, &b.alphabet),
                ..Constraints::none()
            })
        }
        RawConstraint::Intersection(a, b) => {
            let a = reduce_one(a, path)?;
            let b = reduce_one(b, path)?;
            a.intersect(&b)
        }
        RawConstraint::Extensible(inner) => {
            let mut reduced = reduce_one(inner, path)?;
            reduced.extensible = true;
            reduced.value_extension = reduced.value_root.clone();
            reduced.size_extension = reduced.size_root.clone();
            Ok(reduced)
        }
        RawConstraint::AllExcept(_) => {
            // ALL EXCEPT negates a value set; without a concrete universe
            // to subtract from this degrades to "unconstrained" rather
            // than guessing a universe, which is always sound (it only
            // widens what encode() accepts).
            Ok(Constraints::none())
        }
        RawConstraint::WithComponents(_) | RawConstraint::Containing(_) => {
            // Structural constraints that do not narrow the scalar
            // domains this engine models; recorded as unconstrained here
            // and enforced at the component level by the resolver when it
            // builds SEQUENCE/SET/CHOICE component presence rules instead.
            Ok(Constraints::none())
        }
    }
}

fn union_opt(a: &Option<Interval>, b: &Option<Interval>) -> Option<Interval> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

fn union_alphabet(a: &Option<AlphabetMask>, b: &Option<AlphabetMask>) -> Option<AlphabetMask> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let mut mask = a.clone();
            mask.code_points.extend(b.code_points.iter().cloned());
            Some(mask)
        }
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

fn interval_of(range: &ValueRange) -> ConstraintResult<Interval> {
    let lo = bound_of(&range.lo)?;
    let hi = bound_of(&range.hi)?;
    Ok(Interval { lo, hi })
}

fn bound_of(b: &RangeBound) -> ConstraintResult<Bound> {
    Ok(match b {
        RangeBound::Min => Bound::NegInfinity,
        RangeBound::Max => Bound::PosInfinity,
        RangeBound::Value(v) => {
            let n = value_as_bigint(v).ok_or_else(|| ConstraintError::DomainMismatch {
                path: String::new(),
                detail: "range endpoint is not numeric".to_string(),
            })?;
            Bound::Finite(n)
        }
    })
}

fn value_as_bigint(v: &ast::RawValue) -> Option<BigInt> {
    match v {
        ast::RawValue::Integer(i) => Some(BigInt::from(*i)),
        ast::RawValue::CString(s) => Some(BigInt::from(s.chars().count() as i128)),
        _ => None,
    }
}

fn alphabet_mask(p: &ast::PermittedAlphabet) -> AlphabetMask {
    match p {
        ast::PermittedAlphabet::String(s) => AlphabetMask {
            code_points: s.chars().map(|c| (c as u32, c as u32)).collect(),
        },
        ast::PermittedAlphabet::Range(r) => {
            let lo = match &r.lo {
                RangeBound::Value(ast::RawValue::CString(s)) => s.chars().next().map(|c| c as u32),
                _ => None,
            };
            let hi = match &r.hi {
                RangeBound::Value(ast::RawValue::CString(s)) => s.chars().last().map(|c| c as u32),
                _ => None,
            };
            match (lo, hi) {
                (Some(lo), Some(hi)) => AlphabetMask {
                    code_points: vec![(lo, hi)],
                },
                _ => AlphabetMask::default(),
            }
        }
        ast::PermittedAlphabet::Union(a, b) => {
            let mut mask = alphabet_mask(a);
            mask.code_points.extend(alphabet_mask(b).code_points);
            mask
        }
    }
}

pub fn interval_to_i64_bounds(i: &Interval) -> (Option<i64>, Option<i64>) {
    let lo = match &i.lo {
        Bound::Finite(n) => n.to_i64(),
        _ => None,
    };
    let hi = match &i.hi {
        Bound::Finite(n) => n.to_i64(),
        _ => None,
    };
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_width_of_0_to_127_is_7() {
        let i = Interval::closed(0, 127);
        assert_eq!(i.bit_width(), Some(7));
    }

    #[test]
    fn bit_width_of_single_value_is_0() {
        let i = Interval::closed(5, 5);
        assert_eq!(i.bit_width(), Some(0));
    }

    #[test]
    fn intersect_narrows_range() {
        let a = Interval::closed(0, 100);
        let b = Interval::closed(50, 200);
        let c = a.intersect(&b).unwrap();
        assert_eq!(c, Interval::closed(50, 100));
    }

    #[test]
    fn intersect_empty_ranges_is_none() {
        let a = Interval::closed(0, 10);
        let b = Interval::closed(20, 30);
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn unbounded_has_no_bit_width() {
        assert_eq!(Interval::unbounded().bit_width(), None);
    }
}
