//! The resolved, immutable type model (C4): a true graph of type nodes
//! addressed by arena index, as called for by the design notes — this
//! lets recursive ASN.1 types (`List ::= SEQUENCE { head T, tail List
//! OPTIONAL }`) exist as back-edges rather than requiring an owned,
//! infinitely-deep tree.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::ast::RawValue;
use crate::constraints::Constraints;

/// Index into a [`TypeArena`]. Stable for the lifetime of the arena that
/// produced it; never reused across different `compile`/`parse` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagMode {
    Explicit,
    Implicit,
}

/// The effective tag of a resolved type, computed by the resolver from
/// the surface IMPLICIT/EXPLICIT/AUTOMATIC rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub number: u32,
    pub mode: TagMode,
}

impl Tag {
    pub const fn universal(number: u32) -> Self {
        Self {
            class: TagClass::Universal,
            number,
            mode: TagMode::Implicit,
        }
    }

    /// Universal-class tag numbers per X.208/X.680 clause 8.
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const OBJECT_DESCRIPTOR: u32 = 7;
    pub const EXTERNAL: u32 = 8;
    pub const REAL: u32 = 9;
    pub const ENUMERATED: u32 = 10;
    pub const EMBEDDED_PDV: u32 = 11;
    pub const UTF8_STRING: u32 = 12;
    pub const RELATIVE_OID: u32 = 13;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const NUMERIC_STRING: u32 = 18;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const TELETEX_STRING: u32 = 20;
    pub const VIDEOTEX_STRING: u32 = 21;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const GRAPHIC_STRING: u32 = 25;
    pub const VISIBLE_STRING: u32 = 26;
    pub const GENERAL_STRING: u32 = 27;
    pub const UNIVERSAL_STRING: u32 = 28;
    pub const CHARACTER_STRING: u32 = 29;
    pub const BMP_STRING: u32 = 30;
    pub const DATE: u32 = 31;
    pub const TIME_OF_DAY: u32 = 32;
    pub const DATE_TIME: u32 = 33;
    pub const DURATION: u32 = 34;
}

/// A named component of a SEQUENCE/SET/CHOICE.
#[derive(Debug, Clone)]
pub struct NamedComponent {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    /// The component's `DEFAULT` literal, still in its raw (unresolved)
    /// value-notation shape — a codec converts it to its own value
    /// representation to compare against a present component, per X.690's
    /// "DEFAULT values omitted when equal to default" DER invariant.
    /// `has_default()` is `true` exactly when this is `Some`.
    pub default: Option<RawValue>,
    pub extension_addition: bool,
    /// `[[ n: ... ]]` version-bracket group, root components are `None`.
    pub group_id: Option<u32>,
}

impl NamedComponent {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// The discriminant of a resolved type node. Each codec dispatches on
/// this enum directly; adding a codec means adding one matcher per
/// variant rather than subclassing per type, per the design notes.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Boolean,
    Integer,
    Real,
    Null,
    BitString,
    OctetString,
    ObjectIdentifier,
    RelativeOid,
    Enumerated(Vec<(String, i128)>),
    Utf8String,
    Ia5String,
    PrintableString,
    NumericString,
    VisibleString,
    GeneralString,
    BmpString,
    UniversalString,
    TeletexString,
    GraphicString,
    UtcTime,
    GeneralizedTime,
    Date,
    TimeOfDay,
    DateTime,
    Duration,
    ObjectDescriptor,
    External,
    EmbeddedPdv,
    CharacterString,
    Choice {
        alternatives: Vec<NamedComponent>,
        extensible: bool,
    },
    Sequence {
        components: Vec<NamedComponent>,
        extensible: bool,
    },
    Set {
        components: Vec<NamedComponent>,
        extensible: bool,
    },
    SequenceOf(TypeId),
    SetOf(TypeId),
    Any,
    AnyDefinedBy(String),
    OpenType,
    /// A reference that was not collapsed during resolution, kept only
    /// for types the resolver could not fully materialize (never present
    /// once resolution succeeds against a closed module set).
    Reference(String),
}

/// One fully-resolved type node.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub name: Option<String>,
    pub kind: TypeKind,
    pub tag: Tag,
    pub constraints: Constraints,
}

/// The arena of resolved type nodes. Edges between nodes are [`TypeId`]
/// indices, so cycles (legal ASN.1 recursive types) are ordinary graph
/// edges rather than an ownership problem.
#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    nodes: Vec<TypeNode>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A fully-resolved module: its name, object identifier, and the type
/// assignments it exports by name.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: String,
    pub oid: Vec<u64>,
    /// Assignment name -> root type node of that assignment.
    pub types: IndexMap<String, TypeId>,
}

/// The immutable output of the resolver (C3): an arena shared by every
/// module in the compilation, plus a per-module index of assignment
/// names to their root type ids. Cheap to clone (an `Arc` around the
/// arena) so independent worker threads can share one compiled model,
/// per the concurrency model.
#[derive(Debug, Clone)]
pub struct TypeModel {
    pub arena: Arc<TypeArena>,
    pub modules: Arc<IndexMap<String, ResolvedModule>>,
}

impl TypeModel {
    /// Looks up a type assignment by name, searching every module (the
    /// facade's `compile`/`encode`/`decode` operate on a flat type-name
    /// namespace, as the library surface's `encode(type_name, value)`
    /// implies a single compiled spec over possibly several modules).
    pub fn lookup(&self, type_name: &str) -> Option<TypeId> {
        for module in self.modules.values() {
            if let Some(id) = module.types.get(type_name) {
                return Some(*id);
            }
        }
        None
    }

    pub fn node(&self, id: TypeId) -> &TypeNode {
        self.arena.get(id)
    }
}
