//! The raw syntax tree produced by the parser (C2).
//!
//! Names here are still plain strings: a `RawType::Referenced` has not
//! been checked against any symbol table yet. The resolver (C3) walks
//! this tree and a set of sibling trees (one per module) to build the
//! immutable type model (C4).

use std::fmt;

/// One parsed ASN.1 module.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModule {
    pub name: String,
    pub oid: Option<Vec<ObjIdComponent>>,
    pub tagging_default: TaggingDefault,
    pub extensibility_implied: bool,
    pub imports: Vec<ImportsFrom>,
    pub exports: Exports,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggingDefault {
    Explicit,
    Implicit,
    Automatic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exports {
    All,
    Symbols(Vec<String>),
    /// No EXPORTS clause present: everything not imported is exported.
    Unspecified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportsFrom {
    pub module: String,
    pub oid: Option<Vec<ObjIdComponent>>,
    pub symbols: Vec<String>,
}

/// One component of an OBJECT IDENTIFIER value, e.g. `iso(1)` or a bare `2`.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjIdComponent {
    Named(String, u64),
    Numeric(u64),
    /// A reference to a previously defined OID value, e.g. `directory`.
    NameOnly(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub kind: AssignmentKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentKind {
    Type(RawType),
    Value(RawType, RawValue),
    ValueSet(RawType, Vec<RawValue>),
    ObjectClass(ObjectClass),
    Object(String, Vec<ObjectFieldSetting>),
    ObjectSet(String, Vec<Vec<ObjectFieldSetting>>),
}

/// An information object class definition: `CLASS { &field Type, ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectClass {
    pub fields: Vec<ObjectClassField>,
    pub syntax: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectClassField {
    pub name: String,
    pub kind: ObjectClassFieldKind,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectClassFieldKind {
    /// `&Type` — a type field.
    Type,
    /// `&value Type` — a fixed-type value field.
    Value(RawType),
    /// `&Type1, &Type2, ...` appearing as an open-type field placeholder.
    OpenType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFieldSetting {
    pub field: String,
    pub value: ObjectFieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectFieldValue {
    Type(RawType),
    Value(RawValue),
}

/// A raw (unresolved) type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    Builtin(BuiltinType),
    /// `ENUMERATED { a(0), b(1), ... }` — captured with its named values
    /// since the type model carries them, unlike plain INTEGER.
    Enumerated(Vec<EnumItem>, bool),
    Choice(Vec<RawComponent>, Option<ExtensionMarker>),
    Sequence(Vec<RawComponent>, Option<ExtensionMarker>),
    Set(Vec<RawComponent>, Option<ExtensionMarker>),
    SequenceOf(Box<RawType>, Vec<Constraint>),
    SetOf(Box<RawType>, Vec<Constraint>),
    Tagged {
        tag: RawTag,
        mode: Option<TagMode>,
        inner: Box<RawType>,
    },
    Constrained(Box<RawType>, Vec<Constraint>),
    Reference {
        module: Option<String>,
        name: String,
    },
    /// `TypeRef.&field` — a field reference into an information object
    /// class's parameterized type.
    FieldReference { base: String, field: String },
    Any,
    AnyDefinedBy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Boolean,
    Integer,
    Real,
    Null,
    BitString,
    OctetString,
    ObjectIdentifier,
    RelativeOid,
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
    OpenType,
}

/// One `name(value)` entry in an ENUMERATED list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub name: String,
    pub value: i128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawComponent {
    pub name: String,
    pub ty: RawType,
    pub optional: bool,
    pub default: Option<RawValue>,
    /// `[[ n: ... ]]` version-bracket grouping, if any.
    pub group: Option<u32>,
    pub is_extension_addition: bool,
}

/// Position of the `...` marker within a SEQUENCE/SET/CHOICE component
/// list, and the number of extension additions that trail it (used when
/// a `...` is itself followed by further explicitly counted additions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionMarker {
    pub after_component: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTag {
    pub class: TagClass,
    pub number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Explicit,
    Implicit,
}

/// A raw constraint expression, still in surface-syntax shape; C5
/// reduces combinations of these to canonical root/extension form.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Value(ValueRange),
    Size(Box<Constraint>),
    From(PermittedAlphabet),
    Pattern(String),
    WithComponents(Vec<(String, Presence)>),
    Containing(Box<RawType>),
    Union(Box<Constraint>, Box<Constraint>),
    Intersection(Box<Constraint>, Box<Constraint>),
    AllExcept(Box<Constraint>),
    /// Trailing `, ...` making this constraint extensible.
    Extensible(Box<Constraint>),
    Single(RawValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub lo: RangeBound,
    pub hi: RangeBound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeBound {
    Min,
    Max,
    Value(RawValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PermittedAlphabet {
    Range(ValueRange),
    String(String),
    Union(Box<PermittedAlphabet>, Box<PermittedAlphabet>),
}

/// A raw (unresolved) value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Boolean(bool),
    Integer(i128),
    Real(f64),
    Null,
    BitString(Vec<bool>),
    OctetString(Vec<u8>),
    CString(String),
    ObjectIdentifier(Vec<ObjIdComponent>),
    Enumerated(String),
    Sequence(Vec<(String, RawValue)>),
    SequenceOf(Vec<RawValue>),
    Choice(String, Box<RawValue>),
    Reference(String),
    Min,
    Max,
}

impl fmt::Display for TagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagClass::Universal => "UNIVERSAL",
            TagClass::Application => "APPLICATION",
            TagClass::ContextSpecific => "",
            TagClass::Private => "PRIVATE",
        };
        write!(f, "{s}")
    }
}
