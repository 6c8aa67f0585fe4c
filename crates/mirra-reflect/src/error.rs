//! Error types for accessor compilation and invocation
//!
//! Request-time failures (`ReflectError`) are raised by the `create_*`
//! operations; invocation-time failures (`InvokeError`) are raised by the
//! synthesized invokers themselves, because they depend on runtime values
//! unknowable at compilation time.

use mirra_model::ClassId;
use thiserror::Error;

/// Errors raised while resolving a member descriptor or compiling an invoker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReflectError {
    /// Descriptor names a class id the registry does not know
    #[error("Unknown class: class#{}", (.0).0)]
    UnknownClass(ClassId),

    /// Descriptor names a member index the class does not have
    #[error("Unknown member {index} on class '{class}'")]
    UnknownMember {
        /// Declaring class name
        class: String,
        /// Offending member index
        index: u32,
    },

    /// A holder property is indirected through but is itself not readable
    #[error("Value holder is not readable: '{property}'")]
    HolderNotReadable {
        /// Property name
        property: String,
    },

    /// A typed request's owner or member types disagree with the member
    #[error("Invalid type parameter for '{member}': expected {expected}, requested {requested}")]
    TypeMismatch {
        /// Member name
        member: String,
        /// What the member actually declares
        expected: String,
        /// What the caller requested
        requested: String,
    },

    /// A typed factory was requested for an arity beyond the fixed maximum
    #[error("Constructor arity {arity} exceeds the supported maximum of {max}")]
    UnsupportedArity {
        /// Requested arity
        arity: usize,
        /// Supported maximum
        max: usize,
    },
}

/// Result alias for request-time operations.
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Errors raised at invocation time by a synthesized invoker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// Null passed as the instance of an instance accessor
    #[error("Null instance passed to instance accessor")]
    NullInstance,

    /// Instance narrowing failed
    #[error("Instance is not an instance of '{expected}'")]
    InstanceCast {
        /// Expected class name
        expected: String,
    },

    /// The holder reference read from the outer property was null
    #[error("Value holder '{property}' is null")]
    NullHolder {
        /// Outer property name
        property: String,
    },

    /// The holder reference read from the outer property was not an object
    #[error("Value holder '{property}' does not contain an object")]
    InvalidHolder {
        /// Outer property name
        property: String,
    },

    /// A factory argument could not be converted to its parameter type
    #[error("Cannot convert argument {index} from {actual} to {expected}")]
    ArgumentCast {
        /// Positional argument index
        index: usize,
        /// Declared parameter type
        expected: String,
        /// Runtime kind supplied
        actual: String,
    },

    /// Wrong number of factory arguments
    #[error("Expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// A value could not be narrowed or unboxed to the member type
    #[error("Cannot write {actual} to a member of type {expected}")]
    ValueCast {
        /// Declared member type
        expected: String,
        /// Runtime kind supplied
        actual: String,
    },

    /// A write targeted a field slot the instance's storage does not have
    #[error("Field slot {slot} is out of range for the instance storage")]
    MissingSlot {
        /// Offending slot
        slot: u32,
    },
}

/// Result alias for invocation-time operations.
pub type InvokeResult<T> = Result<T, InvokeError>;
