//! ASN.1 module compiler: lexer, recursive-descent parser, cross-module
//! resolver, and the immutable type model the codec engine compiles
//! against.
//!
//! The pipeline is parse-once, compile-many: [`parse_modules`] turns
//! source text into [`ast::RawModule`]s that can be cached or inspected
//! on their own, and [`compile_modules`] resolves a set of them into one
//! [`model::TypeModel`] ready for a codec.

pub mod ast;
pub mod constraints;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod resolver;

use ast::RawModule;
use error::CompileResult;
use model::TypeModel;

/// Parses one source text that may hold several back-to-back module
/// definitions, without resolving references.
pub fn parse_modules(
    source: &str,
    file: &str,
) -> Result<Vec<RawModule>, parser::ModuleParseError> {
    parser::parse_modules_source(source, file)
}

/// Parses and resolves a single source text in one step.
pub fn compile(source: &str, file: &str) -> CompileResult<TypeModel> {
    let modules = parser::parse_modules_source(source, file)
        .map_err(|e| match e {
            parser::ModuleParseError::Lex(e) => error::CompileError::Lex(e),
            parser::ModuleParseError::Parse(e) => error::CompileError::Parse(e),
        })?;
    resolver::resolve(modules)
}

/// Resolves an already-parsed set of modules (possibly parsed from
/// several source files) into one type model.
pub fn compile_modules(modules: Vec<RawModule>) -> CompileResult<TypeModel> {
    resolver::resolve(modules)
}
