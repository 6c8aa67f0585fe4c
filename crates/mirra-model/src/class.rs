//! Class definitions and static type tags
//!
//! Classes are described declaratively: a list of properties (each backed by
//! a field slot), a list of constructors (parameters plus slot assignments),
//! an optional parent for instance narrowing, and zero or more value-holder
//! capability declarations.

use std::fmt;

/// Identifier of a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Static type tag.
///
/// Equality is strict and nominal: `Class(a) == Class(b)` only when the ids
/// are identical, regardless of any parent relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    ISize,
    USize,
    Str,
    /// A registered class (reference, struct, or enum)
    Class(ClassId),
    /// Array with the given element type
    Array(Box<TypeRef>),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::I8 => write!(f, "i8"),
            TypeRef::I16 => write!(f, "i16"),
            TypeRef::I32 => write!(f, "i32"),
            TypeRef::I64 => write!(f, "i64"),
            TypeRef::U8 => write!(f, "u8"),
            TypeRef::U16 => write!(f, "u16"),
            TypeRef::U32 => write!(f, "u32"),
            TypeRef::U64 => write!(f, "u64"),
            TypeRef::F32 => write!(f, "f32"),
            TypeRef::F64 => write!(f, "f64"),
            TypeRef::ISize => write!(f, "isize"),
            TypeRef::USize => write!(f, "usize"),
            TypeRef::Str => write!(f, "str"),
            TypeRef::Class(id) => write!(f, "class#{}", id.0),
            TypeRef::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

/// Integral storage width for enum classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

/// Kind of a class, driving value/reference semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Heap identity, narrowing casts allowed along the parent chain
    Reference,
    /// Value semantics: boxed by copy, zero-initializable field by field
    Struct,
    /// Enumeration over an underlying integral storage type; no fields
    Enum {
        /// Underlying storage type
        underlying: IntKind,
    },
}

/// A property of a class, backed by a field slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Backing slot: an instance field slot, or a static slot when
    /// `is_static` is set
    pub slot: u32,
    /// Class-level property (backed by static storage)
    pub is_static: bool,
    /// Whether reads are permitted
    pub readable: bool,
    /// Whether writes are permitted
    pub writable: bool,
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
}

impl ParamDef {
    /// Build a parameter definition.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One field initialization performed by a constructor: the named slot takes
/// the value of the positional parameter. Slots with no assignment keep
/// their zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAssignment {
    /// Instance field slot to initialize
    pub slot: u32,
    /// Positional index of the source parameter
    pub param: usize,
}

/// A declarative constructor: parameters and the slot assignments they feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDef {
    /// Ordered parameters
    pub params: Vec<ParamDef>,
    /// Field assignments applied after zero-initialization
    pub assignments: Vec<FieldAssignment>,
}

/// A class definition, immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name, unique within a registry
    pub name: String,
    /// Reference, struct, or enum semantics
    pub kind: ClassKind,
    /// Parent class, used only for instance narrowing
    pub parent: Option<ClassId>,
    /// Number of instance field slots
    pub field_count: usize,
    /// Number of static field slots
    pub static_field_count: usize,
    /// Declared properties
    pub properties: Vec<PropertyDef>,
    /// Declared constructors
    pub constructors: Vec<ConstructorDef>,
    /// Value-holder capability instantiations this class exposes. When a
    /// property's declared type is such a class, accessor generation
    /// rewrites access through the class's `value` property. More than one
    /// declaration is tolerated; the first one wins.
    pub holds: Vec<TypeRef>,
}

impl ClassDef {
    /// Start building a class definition.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }
}

/// Fluent builder for `ClassDef`, assigning field slots in declaration order.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    parent: Option<ClassId>,
    properties: Vec<PropertyDef>,
    constructors: Vec<ConstructorDef>,
    holds: Vec<TypeRef>,
    next_slot: u32,
    next_static_slot: u32,
}

impl ClassBuilder {
    /// Start a new reference-class builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Reference,
            parent: None,
            properties: Vec::new(),
            constructors: Vec::new(),
            holds: Vec::new(),
            next_slot: 0,
            next_static_slot: 0,
        }
    }

    /// Set the class kind.
    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the parent class.
    pub fn parent(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    fn push_property(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        is_static: bool,
        readable: bool,
        writable: bool,
    ) -> Self {
        let slot = if is_static {
            let s = self.next_static_slot;
            self.next_static_slot += 1;
            s
        } else {
            let s = self.next_slot;
            self.next_slot += 1;
            s
        };
        self.properties.push(PropertyDef {
            name: name.into(),
            ty,
            slot,
            is_static,
            readable,
            writable,
        });
        self
    }

    /// Add a readable, writable instance property.
    pub fn property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push_property(name, ty, false, true, true)
    }

    /// Add a read-only instance property.
    pub fn readonly_property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push_property(name, ty, false, true, false)
    }

    /// Add a write-only instance property.
    pub fn writeonly_property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push_property(name, ty, false, false, true)
    }

    /// Add a readable, writable static property.
    pub fn static_property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push_property(name, ty, true, true, true)
    }

    /// Declare a value-holder capability instantiation.
    pub fn holds(mut self, inner: TypeRef) -> Self {
        self.holds.push(inner);
        self
    }

    /// Add a constructor with explicit parameters and slot assignments.
    pub fn constructor(
        mut self,
        params: Vec<ParamDef>,
        assignments: Vec<FieldAssignment>,
    ) -> Self {
        self.constructors.push(ConstructorDef {
            params,
            assignments,
        });
        self
    }

    /// Add a constructor whose parameters mirror the instance properties
    /// declared so far, in slot order, each assigned to its own slot.
    pub fn positional_constructor(mut self) -> Self {
        let mut params = Vec::new();
        let mut assignments = Vec::new();
        for prop in self.properties.iter().filter(|p| !p.is_static) {
            assignments.push(FieldAssignment {
                slot: prop.slot,
                param: params.len(),
            });
            params.push(ParamDef::new(prop.name.clone(), prop.ty.clone()));
        }
        self.constructors.push(ConstructorDef {
            params,
            assignments,
        });
        self
    }

    /// Finish the definition.
    pub fn build(self) -> ClassDef {
        ClassDef {
            name: self.name,
            kind: self.kind,
            parent: self.parent,
            field_count: self.next_slot as usize,
            static_field_count: self.next_static_slot as usize,
            properties: self.properties,
            constructors: self.constructors,
            holds: self.holds,
        }
    }
}
