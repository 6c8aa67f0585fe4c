//! Mirra accessor compilation
//!
//! Compiles member descriptors from `mirra-model` into specialized invoker
//! closures and memoizes them per descriptor:
//!
//! - Untyped factories, getters, and setters carry every value through the
//!   dynamic `Value` representation, with boxing and zero-value policy at
//!   the boundary
//! - Typed factories and accessors are specialized to a native signature and
//!   skip boxing entirely; signature agreement with the member is checked at
//!   request time, strictly and nominally
//! - Properties whose declared type carries the value-holder capability are
//!   transparently accessed through the holder's inner `value` property
//!
//! The usual entry point is [`default_factory`], which probes whether
//! invoker synthesis works in the current process and falls back to the
//! uncached reflective implementation when it does not.

mod compiler;
pub mod convention;
pub mod error;
pub mod factory;
pub mod holder;
mod probe;
pub mod tables;

pub use compiler::{
    ArrayAllocator, TypedFactory, TypedGetter, TypedSetter, UntypedFactory, UntypedGetter,
    UntypedSetter,
};
pub use convention::{ArgPack, FactoryArg, NativeValue, SlotMismatch};
pub use error::{InvokeError, InvokeResult, ReflectError, ReflectResult};
pub use factory::{
    default_factory, AccessorFactory, DynamicAccessorFactory, ReflectiveAccessorFactory,
};
pub use holder::{HolderBinding, HolderType, VALUE_PROPERTY};
pub use probe::synthesis_available;
pub use tables::{is_value_type, zero_value, MAX_TYPED_ARITY};
