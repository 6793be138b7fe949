//! Cross-module resolution and error-path integration tests,
//! complementing the per-module unit tests.

use asn1_core::error::{CompileError, ResolveError};
use asn1_core::model::TypeKind;

#[test]
fn resolves_a_type_imported_from_another_module() {
    let modules = asn1_core::parse_modules(
        "Common DEFINITIONS ::= BEGIN \
         Age ::= INTEGER (0..150) \
         END",
        "common.asn",
    )
    .unwrap();
    let mut modules = modules;
    modules.extend(
        asn1_core::parse_modules(
            "Person DEFINITIONS ::= BEGIN \
             IMPORTS Age FROM Common; \
             Human ::= SEQUENCE { age Age } \
             END",
            "person.asn",
        )
        .unwrap(),
    );

    let model = asn1_core::compile_modules(modules).expect("resolves across modules");
    let id = model.lookup("Human").expect("Human is resolved");
    match &model.node(id).kind {
        TypeKind::Sequence { components, .. } => {
            assert_eq!(components.len(), 1);
            assert_eq!(components[0].name, "age");
            let age_kind = &model.node(components[0].ty).kind;
            assert!(matches!(age_kind, TypeKind::Integer));
        }
        other => panic!("expected SEQUENCE, got {other:?}"),
    }
}

#[test]
fn unknown_import_is_reported_as_resolve_error() {
    let modules = asn1_core::parse_modules(
        "Person DEFINITIONS ::= BEGIN \
         IMPORTS Age FROM Common; \
         Human ::= SEQUENCE { age Age } \
         END",
        "person.asn",
    )
    .unwrap();

    let err = asn1_core::compile_modules(modules).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::UnknownImport { .. })
    ));
}

#[test]
fn implicit_tag_on_choice_is_rejected() {
    let err = asn1_core::compile(
        "Test DEFINITIONS ::= BEGIN \
         Bad ::= [0] IMPLICIT CHOICE { a BOOLEAN, b INTEGER } \
         END",
        "<test>",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::IllegalChoiceTag { .. })
    ));
}

#[test]
fn duplicate_assignment_in_one_module_is_rejected() {
    let err = asn1_core::compile(
        "Test DEFINITIONS ::= BEGIN \
         Foo ::= INTEGER \
         Foo ::= BOOLEAN \
         END",
        "<test>",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::DuplicateAssignment { .. })
    ));
}

#[test]
fn constrained_integer_carries_its_bounds_through_resolution() {
    let model = asn1_core::compile(
        "Test DEFINITIONS ::= BEGIN Level ::= INTEGER (1..10) END",
        "<test>",
    )
    .expect("compiles");
    let id = model.lookup("Level").unwrap();
    let constraints = &model.node(id).constraints;
    assert!(!constraints.is_unconstrained(), "Level should carry a root interval constraint");
    assert!(constraints.value_is_finite_root());
}
