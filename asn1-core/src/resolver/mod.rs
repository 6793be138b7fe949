//! The module resolver (C3): turns a set of parsed [`RawModule`]s into one
//! immutable [`TypeModel`] by following references (within and across
//! modules via IMPORTS), computing effective tags, and reducing surface
//! constraint syntax to canonical form.
//!
//! Resolution order is driven by the references themselves rather than a
//! precomputed topological sort: each assignment is resolved on first
//! demand and cached, so mutually-recursive modules (`A` imports from
//! `B`, `B` imports from `A`) work as long as no single reference chain
//! is circular without a constructed type breaking the cycle.

mod symbols;
mod tags;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{
    AssignmentKind, ObjIdComponent, RawComponent, RawModule, RawTag, RawType,
    TagClass as RawTagClass, TagMode as RawTagMode, TaggingDefault,
};
use crate::constraints::{self, Constraints};
use crate::error::{CompileError, CompileResult, ResolveError};
use crate::model::{NamedComponent, Tag, TypeArena, TypeId, TypeKind, TypeModel, TypeNode, ResolvedModule};

use symbols::SymbolTable;

type RResult<T> = Result<T, CompileError>;

/// Resolves a closed set of parsed modules into one compiled type model.
/// "Closed" means every reference must be satisfiable from within
/// `modules` itself — there is no notion of resolving against a
/// previously compiled, separately-loaded model.
pub fn resolve(modules: Vec<RawModule>) -> CompileResult<TypeModel> {
    let symbols = SymbolTable::new(&modules);
    let mut resolver = Resolver {
        symbols,
        arena: TypeArena::new(),
        cache: HashMap::new(),
        resolving: HashSet::new(),
    };

    let mut resolved_modules = IndexMap::new();
    for m in &modules {
        let mut seen_names = HashSet::new();
        let mut types = IndexMap::new();
        for a in &m.assignments {
            if !seen_names.insert(a.name.clone()) {
                return Err(ResolveError::DuplicateAssignment {
                    module: m.name.clone(),
                    name: a.name.clone(),
                }
                .into());
            }
            if matches!(a.kind, AssignmentKind::Type(_)) {
                let id = resolver.resolve_assignment(&m.name, &a.name)?;
                types.insert(a.name.clone(), id);
            }
        }
        let oid = module_oid(m);
        log::debug!("resolved module '{}' ({} types)", m.name, types.len());
        resolved_modules.insert(
            m.name.clone(),
            ResolvedModule {
                name: m.name.clone(),
                oid,
                types,
            },
        );
    }

    Ok(TypeModel {
        arena: Arc::new(resolver.arena),
        modules: Arc::new(resolved_modules),
    })
}

fn module_oid(m: &RawModule) -> Vec<u64> {
    let Some(arcs) = &m.oid else {
        return Vec::new();
    };
    arcs.iter()
        .map(|c| match c {
            ObjIdComponent::Numeric(n) => *n,
            ObjIdComponent::Named(_, n) => *n,
            ObjIdComponent::NameOnly(name) => {
                log::warn!(
                    "module '{}' OID arc '{}' is a bare value reference; recording as 0 \
                     (cross-assignment OID value resolution is not part of the type model)",
                    m.name,
                    name
                );
                0
            }
        })
        .collect()
}

struct Resolver<'a> {
    symbols: SymbolTable<'a>,
    arena: TypeArena,
    /// `(module, assignment name)` -> its resolved root `TypeId`. Entries
    /// for constructed-type assignments are inserted *before* their
    /// components are resolved, so a legally recursive component sees a
    /// cache hit rather than re-entering resolution.
    cache: HashMap<(String, String), TypeId>,
    /// Guards against illegal recursion: a chain of plain type references
    /// (no intervening SEQUENCE/SET/CHOICE) that never terminates.
    resolving: HashSet<(String, String)>,
}

impl<'a> Resolver<'a> {
    fn resolve_assignment(&mut self, module: &str, name: &str) -> RResult<TypeId> {
        let key = (module.to_string(), name.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(*id);
        }

        let (origin_module, assignment) = self.symbols.resolve_assignment(module, name)?;
        let origin_module = origin_module.to_string();
        let AssignmentKind::Type(raw_type) = &assignment.kind else {
            return Err(ResolveError::UnknownReference {
                module: module.to_string(),
                name: name.to_string(),
            }
            .into());
        };
        let path = format!("{origin_module}.{name}");
        let tagging_default = self
            .symbols
            .module(&origin_module)
            .expect("origin module returned by resolve_assignment must exist")
            .tagging_default;
        let origin_key = (origin_module.clone(), name.to_string());

        let is_constructed = matches!(
            raw_type,
            RawType::Sequence(..) | RawType::Set(..) | RawType::Choice(..)
        );

        if is_constructed {
            let stub_id = self.arena.push(TypeNode {
                name: Some(name.to_string()),
                kind: TypeKind::Reference(name.to_string()),
                tag: Tag::universal(0),
                constraints: Constraints::none(),
            });
            self.cache.insert(origin_key, stub_id);
            self.cache.insert(key, stub_id);
            let node = self.build_type_node(&origin_module, &path, tagging_default, raw_type)?;
            *self.arena.get_mut(stub_id) = TypeNode {
                name: Some(name.to_string()),
                ..node
            };
            return Ok(stub_id);
        }

        if !self.resolving.insert(origin_key.clone()) {
            return Err(ResolveError::IllegalRecursion {
                path,
                name: name.to_string(),
            }
            .into());
        }
        let node = self.build_type_node(&origin_module, &path, tagging_default, raw_type);
        self.resolving.remove(&origin_key);
        let node = node?;
        let id = self.arena.push(TypeNode {
            name: Some(name.to_string()),
            ..node
        });
        self.cache.insert(origin_key, id);
        self.cache.insert(key, id);
        Ok(id)
    }

    /// Resolves a type appearing in a non-assignment position (a
    /// component, an element-of, a tagged inner type).
    fn resolve_type(
        &mut self,
        module: &str,
        path: &str,
        tagging_default: TaggingDefault,
        raw: &RawType,
    ) -> RResult<TypeId> {
        match raw {
            RawType::Reference { module: m, name } => {
                let target = m.as_deref().unwrap_or(module);
                self.resolve_assignment(target, name)
            }
            RawType::Tagged { tag, mode, inner } => {
                self.resolve_tagged(module, path, tagging_default, *tag, *mode, inner)
            }
            RawType::Constrained(inner, raw_constraints) => {
                let inner_id = self.resolve_type(module, path, tagging_default, inner)?;
                let inner_node = self.arena.get(inner_id).clone();
                let added = constraints::reduce_constraints(raw_constraints, path)?;
                let merged = inner_node.constraints.intersect(&added)?;
                Ok(self.arena.push(TypeNode {
                    name: None,
                    kind: inner_node.kind,
                    tag: inner_node.tag,
                    constraints: merged,
                }))
            }
            other => {
                let node = self.build_type_node(module, path, tagging_default, other)?;
                Ok(self.arena.push(node))
            }
        }
    }

    fn resolve_tagged(
        &mut self,
        module: &str,
        path: &str,
        tagging_default: TaggingDefault,
        raw_tag: RawTag,
        mode: Option<RawTagMode>,
        inner: &RawType,
    ) -> RResult<TypeId> {
        let inner_id = self.resolve_type(module, path, tagging_default, inner)?;
        let inner_node = self.arena.get(inner_id).clone();
        let eff_tag = tags::effective_tag(raw_tag, mode, tagging_default, &inner_node.kind, path)?;
        Ok(self.arena.push(TypeNode {
            name: None,
            kind: inner_node.kind,
            tag: eff_tag,
            constraints: inner_node.constraints,
        }))
    }

    /// Builds the [`TypeNode`] content (kind + natural tag + constraints)
    /// for a type expression, without pushing it to the arena — callers
    /// either push it fresh or splice it into a pre-reserved stub slot.
    fn build_type_node(
        &mut self,
        module: &str,
        path: &str,
        tagging_default: TaggingDefault,
        raw: &RawType,
    ) -> RResult<TypeNode> {
        match raw {
            RawType::Builtin(b) => Ok(TypeNode {
                name: None,
                kind: builtin_kind(*b),
                tag: tags::universal_tag_for_builtin(*b),
                constraints: Constraints::none(),
            }),
            RawType::Enumerated(items, _extensible) => {
                let values = items.iter().map(|i| (i.name.clone(), i.value)).collect();
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::Enumerated(values),
                    tag: Tag::universal(Tag::ENUMERATED),
                    constraints: Constraints::none(),
                })
            }
            RawType::Choice(comps, ext) => {
                let alternatives =
                    self.resolve_component_list(module, path, tagging_default, comps, true)?;
                check_conflicting_tags(&self.arena, &alternatives, path)?;
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::Choice {
                        alternatives,
                        extensible: ext.is_some(),
                    },
                    // A CHOICE has no tag of its own in BER (it takes the
                    // tag of whichever alternative is present); this is a
                    // placeholder the codec layer never consults.
                    tag: Tag::universal(0),
                    constraints: Constraints::none(),
                })
            }
            RawType::Sequence(comps, ext) => {
                let components =
                    self.resolve_component_list(module, path, tagging_default, comps, false)?;
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::Sequence {
                        components,
                        extensible: ext.is_some(),
                    },
                    tag: Tag::universal(Tag::SEQUENCE),
                    constraints: Constraints::none(),
                })
            }
            RawType::Set(comps, ext) => {
                let components =
                    self.resolve_component_list(module, path, tagging_default, comps, false)?;
                check_conflicting_tags(&self.arena, &components, path)?;
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::Set {
                        components,
                        extensible: ext.is_some(),
                    },
                    tag: Tag::universal(Tag::SET),
                    constraints: Constraints::none(),
                })
            }
            RawType::SequenceOf(elem, raw_constraints) => {
                let elem_path = format!("{path}.item");
                let elem_id = self.resolve_type(module, &elem_path, tagging_default, elem)?;
                let size = constraints::reduce_constraints(raw_constraints, path)?;
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::SequenceOf(elem_id),
                    tag: Tag::universal(Tag::SEQUENCE),
                    constraints: size,
                })
            }
            RawType::SetOf(elem, raw_constraints) => {
                let elem_path = format!("{path}.item");
                let elem_id = self.resolve_type(module, &elem_path, tagging_default, elem)?;
                let size = constraints::reduce_constraints(raw_constraints, path)?;
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::SetOf(elem_id),
                    tag: Tag::universal(Tag::SET),
                    constraints: size,
                })
            }
            RawType::Any => Ok(TypeNode {
                name: None,
                kind: TypeKind::Any,
                tag: Tag::universal(0),
                constraints: Constraints::none(),
            }),
            RawType::AnyDefinedBy(field) => Ok(TypeNode {
                name: None,
                kind: TypeKind::AnyDefinedBy(field.clone()),
                tag: Tag::universal(0),
                constraints: Constraints::none(),
            }),
            RawType::FieldReference { .. } => {
                // Information-object-class field references resolve to
                // an open type placeholder: the concrete type depends on
                // a governing object set that this resolver does not
                // evaluate.
                Ok(TypeNode {
                    name: None,
                    kind: TypeKind::OpenType,
                    tag: Tag::universal(0),
                    constraints: Constraints::none(),
                })
            }
            RawType::Reference { .. } | RawType::Tagged { .. } | RawType::Constrained(..) => {
                // These are handled by resolve_type before reaching here;
                // build_type_node is only called for the remaining, more
                // primitive variants.
                unreachable!("reference/tagged/constrained types are resolved via resolve_type")
            }
        }
    }

    fn resolve_component_list(
        &mut self,
        module: &str,
        path: &str,
        tagging_default: TaggingDefault,
        comps: &[RawComponent],
        _is_choice: bool,
    ) -> RResult<Vec<NamedComponent>> {
        let any_tagged = comps.iter().any(|c| matches!(c.ty, RawType::Tagged { .. }));
        let auto = tags::should_auto_tag(tagging_default, any_tagged);

        let mut out = Vec::with_capacity(comps.len());
        let mut seen = HashSet::new();
        for (i, c) in comps.iter().enumerate() {
            if !seen.insert(c.name.clone()) {
                return Err(ResolveError::DuplicateComponent {
                    path: path.to_string(),
                    component: c.name.clone(),
                }
                .into());
            }
            let comp_path = format!("{path}.{}", c.name);
            let ty_id = if auto {
                let raw_tag = RawTag {
                    class: RawTagClass::ContextSpecific,
                    number: i as u32,
                };
                self.resolve_tagged(module, &comp_path, tagging_default, raw_tag, None, &c.ty)?
            } else {
                self.resolve_type(module, &comp_path, tagging_default, &c.ty)?
            };
            out.push(NamedComponent {
                name: c.name.clone(),
                ty: ty_id,
                optional: c.optional || c.default.is_some(),
                default: c.default.clone(),
                extension_addition: c.is_extension_addition,
                group_id: c.group,
            });
        }
        Ok(out)
    }
}

fn builtin_kind(b: crate::ast::BuiltinType) -> TypeKind {
    use crate::ast::BuiltinType::*;
    match b {
        Boolean => TypeKind::Boolean,
        Integer => TypeKind::Integer,
        Real => TypeKind::Real,
        Null => TypeKind::Null,
        BitString => TypeKind::BitString,
        OctetString => TypeKind::OctetString,
        ObjectIdentifier => TypeKind::ObjectIdentifier,
        RelativeOid => TypeKind::RelativeOid,
        Utf8String => TypeKind::Utf8String,
        Ia5String => TypeKind::Ia5String,
        PrintableString => TypeKind::PrintableString,
        NumericString => TypeKind::NumericString,
        VisibleString => TypeKind::VisibleString,
        GeneralString => TypeKind::GeneralString,
        BmpString => TypeKind::BmpString,
        UniversalString => TypeKind::UniversalString,
        TeletexString => TypeKind::TeletexString,
        GraphicString => TypeKind::GraphicString,
        UtcTime => TypeKind::UtcTime,
        GeneralizedTime => TypeKind::GeneralizedTime,
        Date => TypeKind::Date,
        TimeOfDay => TypeKind::TimeOfDay,
        DateTime => TypeKind::DateTime,
        Duration => TypeKind::Duration,
        ObjectDescriptor => TypeKind::ObjectDescriptor,
        External => TypeKind::External,
        EmbeddedPdv => TypeKind::EmbeddedPdv,
        CharacterString => TypeKind::CharacterString,
        OpenType => TypeKind::OpenType,
    }
}

/// Rejects a component/alternative list where two root (non-extension)
/// entries share the same effective tag — ambiguous for CHOICE and SET,
/// whose member order is not what selects them on the wire.
fn check_conflicting_tags(arena: &TypeArena, comps: &[NamedComponent], path: &str) -> RResult<()> {
    let mut seen: HashMap<(crate::model::TagClass, u32), &str> = HashMap::new();
    for c in comps {
        if c.extension_addition {
            continue;
        }
        let tag = arena.get(c.ty).tag;
        if let Some(prev) = seen.insert((tag.class, tag.number), c.name.as_str()) {
            return Err(ResolveError::ConflictingTag {
                path: path.to_string(),
                detail: format!("'{prev}' and '{}' share tag [{:?} {}]", c.name, tag.class, tag.number),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module_source;

    fn resolve_source(src: &str) -> CompileResult<TypeModel> {
        let m = parse_module_source(src, "<test>").expect("parse");
        resolve(vec![m])
    }

    #[test]
    fn resolves_simple_sequence() {
        let model = resolve_source(
            r#"
            Test DEFINITIONS ::=
            BEGIN
                Foo ::= SEQUENCE { a BOOLEAN, b INTEGER OPTIONAL }
            END
            "#,
        )
        .unwrap();
        let id = model.lookup("Foo").unwrap();
        match &model.node(id).kind {
            TypeKind::Sequence { components, .. } => {
                assert_eq!(components.len(), 2);
                assert!(!components[0].optional);
                assert!(components[1].optional);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn resolves_recursive_sequence_without_overflow() {
        let model = resolve_source(
            r#"
            Test DEFINITIONS ::=
            BEGIN
                List ::= SEQUENCE { head INTEGER, tail List OPTIONAL }
            END
            "#,
        )
        .unwrap();
        let id = model.lookup("List").unwrap();
        match &model.node(id).kind {
            TypeKind::Sequence { components, .. } => {
                let tail_id = components[1].ty;
                assert_eq!(tail_id, id, "self-referencing component must reuse the same TypeId");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn rejects_implicit_tag_on_choice() {
        let err = resolve_source(
            r#"
            Test DEFINITIONS ::=
            BEGIN
                Inner ::= CHOICE { a BOOLEAN, b INTEGER }
                Outer ::= [3] IMPLICIT Inner
            END
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Resolve(ResolveError::IllegalChoiceTag { .. })));
    }

    #[test]
    fn automatic_tagging_assigns_sequential_context_tags() {
        let model = resolve_source(
            r#"
            Test DEFINITIONS AUTOMATIC TAGS ::=
            BEGIN
                Q ::= CHOICE { x INTEGER, y BOOLEAN }
            END
            "#,
        )
        .unwrap();
        let id = model.lookup("Q").unwrap();
        match &model.node(id).kind {
            TypeKind::Choice { alternatives, .. } => {
                assert_eq!(alternatives[0].name, "x");
                assert_eq!(model.node(alternatives[0].ty).tag.number, 0);
                assert_eq!(model.node(alternatives[1].ty).tag.number, 1);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_component_names() {
        let err = resolve_source(
            r#"
            Test DEFINITIONS ::=
            BEGIN
                Foo ::= SEQUENCE { a BOOLEAN, a INTEGER }
            END
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Resolve(ResolveError::DuplicateComponent { .. })
        ));
    }

    #[test]
    fn resolves_enumerated_named_values() {
        let model = resolve_source(
            r#"
            Test DEFINITIONS ::=
            BEGIN
                Color ::= ENUMERATED { red(0), green(1), blue(2) }
            END
            "#,
        )
        .unwrap();
        let id = model.lookup("Color").unwrap();
        match &model.node(id).kind {
            TypeKind::Enumerated(items) => {
                assert_eq!(items, &vec![
                    ("red".to_string(), 0),
                    ("green".to_string(), 1),
                    ("blue".to_string(), 2),
                ]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
