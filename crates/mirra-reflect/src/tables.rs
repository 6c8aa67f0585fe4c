//! Type classification and zero-value tables
//!
//! Static mappings consumed by the invoker compiler: which types carry value
//! semantics, what "zero" means for each of them, and how a dynamic value is
//! narrowed or unboxed into a declared type.

use mirra_model::{ClassKind, EnumValue, ObjectRef, TypeRef, TypeRegistry, Value};

use crate::error::InvokeError;

/// Maximum arity covered by the fixed-arity typed factory family.
pub const MAX_TYPED_ARITY: usize = 16;

/// Whether a type carries value semantics (boxed/unboxed at the untyped
/// boundary, zero-initialized when absent).
pub fn is_value_type(registry: &TypeRegistry, ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Bool
        | TypeRef::I8
        | TypeRef::I16
        | TypeRef::I32
        | TypeRef::I64
        | TypeRef::U8
        | TypeRef::U16
        | TypeRef::U32
        | TypeRef::U64
        | TypeRef::F32
        | TypeRef::F64
        | TypeRef::ISize
        | TypeRef::USize => true,
        TypeRef::Str | TypeRef::Array(_) => false,
        TypeRef::Class(id) => matches!(
            registry.class(*id).map(|entry| entry.def.kind),
            Some(ClassKind::Struct) | Some(ClassKind::Enum { .. })
        ),
    }
}

/// Zero representation written when an untyped setter receives an absent
/// value for a value-typed member.
///
/// Booleans and integral types map to 0, floating types to 0.0,
/// pointer-sized types to 0. Enums take the zero repr of their underlying
/// storage type (0 for every integral width). Structs are zero-initialized
/// generically, slot by slot. Reference types have no zero and yield null.
pub fn zero_value(registry: &TypeRegistry, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Bool => Value::Bool(false),
        TypeRef::I8 => Value::I8(0),
        TypeRef::I16 => Value::I16(0),
        TypeRef::I32 => Value::I32(0),
        TypeRef::I64 => Value::I64(0),
        TypeRef::U8 => Value::U8(0),
        TypeRef::U16 => Value::U16(0),
        TypeRef::U32 => Value::U32(0),
        TypeRef::U64 => Value::U64(0),
        TypeRef::F32 => Value::F32(0.0),
        TypeRef::F64 => Value::F64(0.0),
        TypeRef::ISize => Value::ISize(0),
        TypeRef::USize => Value::USize(0),
        TypeRef::Str | TypeRef::Array(_) => Value::Null,
        TypeRef::Class(id) => match registry.class(*id) {
            Some(entry) => match entry.def.kind {
                ClassKind::Reference => Value::Null,
                ClassKind::Enum { .. } => Value::Enum(EnumValue {
                    class: *id,
                    repr: 0,
                }),
                ClassKind::Struct => {
                    let mut fields = vec![Value::Null; entry.def.field_count];
                    for prop in entry.def.properties.iter().filter(|p| !p.is_static) {
                        fields[prop.slot as usize] = zero_value(registry, &prop.ty);
                    }
                    Value::Object(ObjectRef::from_fields(*id, fields))
                }
            },
            None => Value::Null,
        },
    }
}

/// Unbox a dynamic value as an exact value type. No widening, no subtype
/// tolerance: the runtime kind must match the declared type precisely.
pub fn unbox_exact(ty: &TypeRef, value: Value) -> Result<Value, InvokeError> {
    let ok = match (ty, &value) {
        (TypeRef::Bool, Value::Bool(_))
        | (TypeRef::I8, Value::I8(_))
        | (TypeRef::I16, Value::I16(_))
        | (TypeRef::I32, Value::I32(_))
        | (TypeRef::I64, Value::I64(_))
        | (TypeRef::U8, Value::U8(_))
        | (TypeRef::U16, Value::U16(_))
        | (TypeRef::U32, Value::U32(_))
        | (TypeRef::U64, Value::U64(_))
        | (TypeRef::F32, Value::F32(_))
        | (TypeRef::F64, Value::F64(_))
        | (TypeRef::ISize, Value::ISize(_))
        | (TypeRef::USize, Value::USize(_)) => true,
        (TypeRef::Class(id), Value::Enum(e)) => e.class == *id,
        (TypeRef::Class(id), Value::Object(o)) => o.class_id() == *id,
        _ => false,
    };
    if !ok {
        return Err(InvokeError::ValueCast {
            expected: ty.to_string(),
            actual: value.kind_name().to_string(),
        });
    }
    // unboxing a struct copies it out of the box
    if let Value::Object(obj) = &value {
        return Ok(Value::Object(obj.duplicate()));
    }
    Ok(value)
}

/// Checked reference-type narrowing of a dynamic value. Null always passes;
/// a non-null value must be of the declared reference type (subclasses are
/// accepted along the parent chain).
pub fn cast_reference(
    registry: &TypeRegistry,
    ty: &TypeRef,
    value: Value,
) -> Result<Value, InvokeError> {
    let ok = match (&value, ty) {
        (Value::Null, _) => true,
        (Value::Str(_), TypeRef::Str) => true,
        (Value::Object(obj), TypeRef::Class(id)) => registry.is_instance_of(obj.class_id(), *id),
        (Value::Array(arr), TypeRef::Array(elem)) => arr.elem_type() == elem.as_ref(),
        _ => false,
    };
    if ok {
        Ok(value)
    } else {
        Err(InvokeError::ValueCast {
            expected: ty.to_string(),
            actual: value.kind_name().to_string(),
        })
    }
}

/// Convert a positional factory argument to its declared parameter type:
/// exact unboxing for value types, checked narrowing for reference types.
pub fn convert_argument(
    registry: &TypeRegistry,
    ty: &TypeRef,
    value: Value,
    index: usize,
) -> Result<Value, InvokeError> {
    let converted = if is_value_type(registry, ty) {
        unbox_exact(ty, value)
    } else {
        cast_reference(registry, ty, value)
    };
    converted.map_err(|err| match err {
        InvokeError::ValueCast { expected, actual } => InvokeError::ArgumentCast {
            index,
            expected,
            actual,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_model::{ClassDef, ClassId, ClassKind, IntKind};

    #[test]
    fn test_primitive_zero_values() {
        let registry = TypeRegistry::new();
        assert_eq!(zero_value(&registry, &TypeRef::Bool), Value::Bool(false));
        assert_eq!(zero_value(&registry, &TypeRef::I32), Value::I32(0));
        assert_eq!(zero_value(&registry, &TypeRef::U64), Value::U64(0));
        assert_eq!(zero_value(&registry, &TypeRef::F64), Value::F64(0.0));
        assert_eq!(zero_value(&registry, &TypeRef::USize), Value::USize(0));
        assert_eq!(zero_value(&registry, &TypeRef::Str), Value::Null);
    }

    #[test]
    fn test_enum_zero_is_zero_repr() {
        let registry = TypeRegistry::new();
        let color = registry.register(
            ClassDef::builder("Color")
                .kind(ClassKind::Enum {
                    underlying: IntKind::U8,
                })
                .build(),
        );
        assert_eq!(
            zero_value(&registry, &TypeRef::Class(color)),
            Value::Enum(EnumValue {
                class: color,
                repr: 0
            })
        );
    }

    #[test]
    fn test_struct_zero_initializes_every_slot() {
        let registry = TypeRegistry::new();
        let point = registry.register(
            ClassDef::builder("Point")
                .kind(ClassKind::Struct)
                .property("x", TypeRef::I32)
                .property("y", TypeRef::F64)
                .property("label", TypeRef::Str)
                .build(),
        );

        let zero = zero_value(&registry, &TypeRef::Class(point));
        let obj = zero.as_object().unwrap();
        assert_eq!(obj.field(0), Some(Value::I32(0)));
        assert_eq!(obj.field(1), Some(Value::F64(0.0)));
        assert_eq!(obj.field(2), Some(Value::Null));
    }

    #[test]
    fn test_value_type_classification() {
        let registry = TypeRegistry::new();
        let reference = registry.register(ClassDef::builder("Ref").build());
        let strukt = registry.register(
            ClassDef::builder("Struct")
                .kind(ClassKind::Struct)
                .build(),
        );

        assert!(is_value_type(&registry, &TypeRef::I8));
        assert!(is_value_type(&registry, &TypeRef::Class(strukt)));
        assert!(!is_value_type(&registry, &TypeRef::Class(reference)));
        assert!(!is_value_type(&registry, &TypeRef::Str));
        assert!(!is_value_type(
            &registry,
            &TypeRef::Array(Box::new(TypeRef::I8))
        ));
    }

    #[test]
    fn test_unbox_requires_exact_kind() {
        assert!(unbox_exact(&TypeRef::I32, Value::I32(1)).is_ok());
        assert!(unbox_exact(&TypeRef::I32, Value::I64(1)).is_err());
        assert!(unbox_exact(&TypeRef::I32, Value::Null).is_err());
    }

    #[test]
    fn test_reference_cast_accepts_null_and_subclass() {
        let registry = TypeRegistry::new();
        let base = registry.register(ClassDef::builder("Base").build());
        let derived = registry.register(ClassDef::builder("Derived").parent(base).build());
        let other = registry.register(ClassDef::builder("Other").build());

        let instance = Value::Object(ObjectRef::new(derived, 0));
        assert!(cast_reference(&registry, &TypeRef::Class(base), instance.clone()).is_ok());
        assert!(cast_reference(&registry, &TypeRef::Class(other), instance).is_err());
        assert!(cast_reference(&registry, &TypeRef::Class(base), Value::Null).is_ok());
    }

    #[test]
    fn test_convert_argument_reports_position() {
        let registry = TypeRegistry::new();
        let err = convert_argument(&registry, &TypeRef::I32, Value::str("no"), 3).unwrap_err();
        assert_eq!(
            err,
            InvokeError::ArgumentCast {
                index: 3,
                expected: "i32".to_string(),
                actual: "str".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_class_zero_is_null() {
        let registry = TypeRegistry::new();
        assert_eq!(
            zero_value(&registry, &TypeRef::Class(ClassId(42))),
            Value::Null
        );
    }
}
