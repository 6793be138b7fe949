//! Compile-time error categories for the ASN.1 module compiler.
//!
//! Each phase of compilation (lexing, parsing, resolution, constraint
//! reduction) raises its own error type so callers can match on category,
//! as required by the error taxonomy of the toolkit's core design.

use std::fmt;

/// A 1-based line/column position within a single source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Error raised while tokenizing ASN.1 source text.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("lex error at {position}: {message}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Error raised while building a raw syntax tree from a token stream.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("parse error in {file} at {position}: expected {expected}, {message}")]
pub struct ParseError {
    pub file: String,
    pub position: Position,
    pub expected: String,
    pub message: String,
}

impl ParseError {
    pub fn new(
        file: impl Into<String>,
        position: Position,
        expected: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            position,
            expected: expected.into(),
            message: message.into(),
        }
    }
}

/// Error raised while resolving references, tags and constraints across
/// one or more parsed modules into the immutable type model.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown reference '{name}' in module '{module}'")]
    UnknownReference { module: String, name: String },

    #[error("'{name}' is defined more than once in module '{module}'")]
    DuplicateAssignment { module: String, name: String },

    #[error("duplicate component name '{component}' in {path}")]
    DuplicateComponent { path: String, component: String },

    #[error("conflicting tags on components of {path}: {detail}")]
    ConflictingTag { path: String, detail: String },

    #[error(
        "illegal IMPLICIT tag applied to CHOICE at {path}: CHOICE alternatives are never \
         implicitly re-tagged, per X.680; use EXPLICIT"
    )]
    IllegalChoiceTag { path: String },

    #[error("illegal type recursion at {path}: '{name}' is not wrapped in a constructed type")]
    IllegalRecursion { path: String, name: String },

    #[error("module '{module}' imports unknown symbol '{symbol}' from '{from}'")]
    UnknownImport {
        module: String,
        symbol: String,
        from: String,
    },
}

/// Error raised while reducing a constraint expression to canonical form.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("constraint at {path} has no finite root and cannot be used where one is required")]
    NoFiniteRoot { path: String },

    #[error("constraint at {path} combines incompatible domains: {detail}")]
    DomainMismatch { path: String, detail: String },

    #[error("empty intersection in constraint at {path}: {detail}")]
    EmptyIntersection { path: String, detail: String },
}

/// Any compile-time error, used where a caller wants a single error type
/// across lex/parse/resolve/constraint phases (e.g. `parse_modules`).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

pub type LexResult<T> = Result<T, LexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type ConstraintResult<T> = Result<T, ConstraintError>;
pub type CompileResult<T> = Result<T, CompileError>;
