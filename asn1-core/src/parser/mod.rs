//! Recursive-descent parser over the lexer's token stream.
//!
//! Follows the X.680 grammar with one-token lookahead (`Cursor`). The
//! output is a [`RawModule`](crate::ast::RawModule) — references are
//! unresolved strings at this stage; resolution is the resolver's job.

mod constraints;
mod cursor;
mod module;
mod types;
mod values;

pub use cursor::Cursor;

use crate::ast::RawModule;
use crate::error::{LexError, ParseError};
use crate::lexer::Lexer;

/// Parses a single module from its ASN.1 source text.
pub fn parse_module_source(source: &str, file: &str) -> Result<RawModule, ModuleParseError> {
    let tokens = Lexer::new(source, file).tokenize().map_err(ModuleParseError::Lex)?;
    let mut cur = Cursor::new(&tokens, file);
    let m = module::parse_module(&mut cur).map_err(ModuleParseError::Parse)?;
    if !cur.at_eof() {
        return Err(ModuleParseError::Parse(
            cur.unexpected("end of module definitions"),
        ));
    }
    log::debug!("parsed module '{}' ({} assignments)", m.name, m.assignments.len());
    Ok(m)
}

/// Parses every module in a source text that may contain several
/// `Module DEFINITIONS ::= BEGIN ... END` blocks back to back.
pub fn parse_modules_source(source: &str, file: &str) -> Result<Vec<RawModule>, ModuleParseError> {
    let tokens = Lexer::new(source, file).tokenize().map_err(ModuleParseError::Lex)?;
    let mut cur = Cursor::new(&tokens, file);
    let mut modules = Vec::new();
    while !cur.at_eof() {
        modules.push(module::parse_module(&mut cur).map_err(ModuleParseError::Parse)?);
    }
    Ok(modules)
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModuleParseError {
    #[error(transparent)]
    Lex(LexError),
    #[error(transparent)]
    Parse(ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    #[test]
    fn parses_module_header_and_simple_type() {
        let src = r#"
            Test DEFINITIONS AUTOMATIC TAGS ::=
            BEGIN
                Foo ::= INTEGER (0..127)
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        assert_eq!(m.name, "Test");
        assert_eq!(m.tagging_default, TaggingDefault::Automatic);
        assert_eq!(m.assignments.len(), 1);
        assert_eq!(m.assignments[0].name, "Foo");
    }

    #[test]
    fn parses_sequence_with_optional_and_extension() {
        let src = r#"
            Test DEFINITIONS ::=
            BEGIN
                Bar ::= SEQUENCE {
                    a BOOLEAN,
                    b INTEGER OPTIONAL,
                    ...,
                    c BOOLEAN DEFAULT TRUE
                }
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        match &m.assignments[0].kind {
            AssignmentKind::Type(RawType::Sequence(comps, ext)) => {
                assert_eq!(comps.len(), 3);
                assert!(comps[1].optional);
                assert!(ext.is_some());
                assert!(comps[2].is_extension_addition);
            }
            other => panic!("unexpected assignment kind: {other:?}"),
        }
    }

    #[test]
    fn parses_choice_with_implicit_context_tags() {
        let src = r#"
            Test DEFINITIONS ::=
            BEGIN
                Q ::= CHOICE { x [0] IMPLICIT INTEGER, y [1] IMPLICIT BOOLEAN }
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        match &m.assignments[0].kind {
            AssignmentKind::Type(RawType::Choice(comps, _)) => {
                assert_eq!(comps.len(), 2);
                match &comps[0].ty {
                    RawType::Tagged { tag, mode, .. } => {
                        assert_eq!(tag.number, 0);
                        assert_eq!(*mode, Some(TagMode::Implicit));
                    }
                    other => panic!("expected tagged type, got {other:?}"),
                }
            }
            other => panic!("unexpected assignment kind: {other:?}"),
        }
    }

    #[test]
    fn parses_imports_and_exports() {
        let src = r#"
            Test DEFINITIONS ::=
            BEGIN
                EXPORTS Foo, bar;
                IMPORTS Other FROM Elsewhere { 1 2 3 };
                Foo ::= NULL
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        assert_eq!(m.imports.len(), 1);
        assert_eq!(m.imports[0].module, "Elsewhere");
        assert_eq!(m.imports[0].symbols, vec!["Other".to_string()]);
        match &m.exports {
            Exports::Symbols(names) => assert_eq!(names, &vec!["Foo".to_string(), "bar".to_string()]),
            other => panic!("unexpected exports: {other:?}"),
        }
    }

    #[test]
    fn parses_sequence_of_with_size_constraint() {
        let src = r#"
            Test DEFINITIONS ::=
            BEGIN
                T ::= SEQUENCE (SIZE(1..4)) OF INTEGER
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        match &m.assignments[0].kind {
            AssignmentKind::Type(RawType::SequenceOf(_, constraints)) => {
                assert_eq!(constraints.len(), 1);
            }
            other => panic!("unexpected assignment kind: {other:?}"),
        }
    }

    #[test]
    fn parses_object_identifier_value() {
        let src = r#"
            Test DEFINITIONS ::=
            BEGIN
                rsa OBJECT IDENTIFIER ::= { iso(1) member-body(2) us(840) 113549 }
            END
        "#;
        let m = parse_module_source(src, "<test>").unwrap();
        match &m.assignments[0].kind {
            AssignmentKind::Value(_, RawValue::ObjectIdentifier(arcs)) => {
                assert_eq!(arcs.len(), 4);
            }
            other => panic!("unexpected assignment kind: {other:?}"),
        }
    }

    #[test]
    fn reports_parse_error_with_position() {
        let src = "Test DEFINITIONS ::= BEGIN Foo ::= SEQUENCE END";
        let err = parse_module_source(src, "<test>").unwrap_err();
        assert!(matches!(err, ModuleParseError::Parse(_)));
    }
}
