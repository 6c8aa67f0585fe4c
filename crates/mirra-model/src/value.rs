//! Runtime values
//!
//! `Value` is the universal dynamic representation used by the untyped
//! calling convention: every native value is carried boxed inside a variant,
//! and `Value::Null` doubles as the "absent" marker.

use std::sync::Arc;

use crate::class::ClassId;
use crate::object::{ArrayRef, ObjectRef};

/// Dynamic runtime value.
///
/// Scalars are stored inline; strings, objects, and arrays are shared by
/// reference. Equality is structural for scalars and strings and identity
/// for objects and arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value / null reference
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Signed integers
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Unsigned integers
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// Floating point
    F32(f32),
    F64(f64),
    /// Pointer-sized integers
    ISize(isize),
    USize(usize),
    /// Shared string
    Str(Arc<str>),
    /// Enumeration value (class + integral repr)
    Enum(EnumValue),
    /// Heap object (reference or boxed struct instance)
    Object(ObjectRef),
    /// Heap array
    Array(ArrayRef),
}

/// A value of an enum class: the class it belongs to and its integral repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    /// Enum class
    pub class: ClassId,
    /// Discriminant, widened to i64 regardless of the underlying storage type
    pub repr: i64,
}

impl Value {
    /// Build a string value from a `&str`.
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    /// Whether this is the null/absent value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the runtime kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::ISize(_) => "isize",
            Value::USize(_) => "usize",
            Value::Str(_) => "str",
            Value::Enum(_) => "enum",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    /// Extract a bool, if that is the runtime kind.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an i32, if that is the runtime kind.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract an i64, if that is the runtime kind.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract an f64, if that is the runtime kind.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the object reference, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow the array reference, if this is an array.
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Extract the enum value, if this is an enum.
    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(e) => Some(*e),
            _ => None,
        }
    }
}
