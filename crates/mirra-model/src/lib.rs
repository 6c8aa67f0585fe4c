//! Mirra dynamic object model
//!
//! This crate provides the runtime half of the Mirra reflection stack:
//! - Dynamic values (`Value`) carried through the untyped calling convention
//! - Class definitions (`ClassDef`) with properties, constructors, and
//!   value-holder capability declarations
//! - A process-wide `TypeRegistry` that owns registered classes and their
//!   static field storage
//! - Heap objects (`ObjectRef`) and arrays (`ArrayRef`) with interior
//!   mutability, shared by reference
//!
//! Member descriptors (`PropertyId`, `ConstructorId`) are small identity
//! tokens into the registry; the `mirra-reflect` crate compiles accessor and
//! factory invokers against them.

pub mod class;
pub mod object;
pub mod registry;
pub mod value;

pub use class::{
    ClassBuilder, ClassDef, ClassId, ClassKind, ConstructorDef, FieldAssignment, IntKind,
    ParamDef, PropertyDef, TypeRef,
};
pub use object::{ArrayRef, ObjectRef};
pub use registry::{ClassEntry, ConstructorId, PropertyId, TypeRegistry};
pub use value::{EnumValue, Value};
