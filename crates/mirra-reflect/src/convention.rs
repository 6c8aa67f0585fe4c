//! Typed calling convention
//!
//! The typed invoker family trades one invoker variant per concrete
//! signature for the absence of boxing at the call boundary. `NativeValue`
//! enumerates the native types a typed accessor can expose; `ArgPack` is
//! implemented for argument tuples of arity 0 through `MAX_TYPED_ARITY`,
//! mirroring the fixed family of supported factory shapes. A `Value` element
//! in a pack is the dynamic slot: it satisfies any parameter statically and
//! is converted at invocation time.

use std::sync::Arc;

use mirra_model::{TypeRef, TypeRegistry, Value};

use crate::error::InvokeError;
use crate::tables::convert_argument;

/// A native type usable as the member type of a typed accessor.
///
/// The mapping to `TypeRef` is strict and nominal; `from_value` does not
/// widen or convert.
pub trait NativeValue: Sized + Send + Sync + 'static {
    /// Static type tag this native type corresponds to.
    fn type_ref() -> TypeRef;
    /// Box into the dynamic representation.
    fn into_value(self) -> Value;
    /// Unbox from the dynamic representation, exact kind only.
    fn from_value(value: Value) -> Option<Self>;
}

/// One argument slot of a typed factory signature.
pub trait FactoryArg: Send + Sync + 'static {
    /// Whether this slot's static type satisfies the declared parameter
    /// without conversion, or is the dynamic slot.
    fn matches(param: &TypeRef) -> bool;
    /// Display name for diagnostics.
    fn type_name() -> String;
    /// Produce the dynamic argument for the construction call.
    fn into_arg(
        self,
        registry: &TypeRegistry,
        param: &TypeRef,
        index: usize,
    ) -> Result<Value, InvokeError>;
}

macro_rules! native_value {
    ($rust:ty, $tag:ident) => {
        impl NativeValue for $rust {
            fn type_ref() -> TypeRef {
                TypeRef::$tag
            }

            fn into_value(self) -> Value {
                Value::$tag(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$tag(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl FactoryArg for $rust {
            fn matches(param: &TypeRef) -> bool {
                *param == TypeRef::$tag
            }

            fn type_name() -> String {
                TypeRef::$tag.to_string()
            }

            fn into_arg(
                self,
                _registry: &TypeRegistry,
                _param: &TypeRef,
                _index: usize,
            ) -> Result<Value, InvokeError> {
                Ok(self.into_value())
            }
        }
    };
}

native_value!(bool, Bool);
native_value!(i8, I8);
native_value!(i16, I16);
native_value!(i32, I32);
native_value!(i64, I64);
native_value!(u8, U8);
native_value!(u16, U16);
native_value!(u32, U32);
native_value!(u64, U64);
native_value!(f32, F32);
native_value!(f64, F64);
native_value!(isize, ISize);
native_value!(usize, USize);

impl NativeValue for Arc<str> {
    fn type_ref() -> TypeRef {
        TypeRef::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FactoryArg for Arc<str> {
    fn matches(param: &TypeRef) -> bool {
        *param == TypeRef::Str
    }

    fn type_name() -> String {
        TypeRef::Str.to_string()
    }

    fn into_arg(
        self,
        _registry: &TypeRegistry,
        _param: &TypeRef,
        _index: usize,
    ) -> Result<Value, InvokeError> {
        Ok(Value::Str(self))
    }
}

/// The dynamic slot: accepted for any parameter type, converted per call.
impl FactoryArg for Value {
    fn matches(_param: &TypeRef) -> bool {
        true
    }

    fn type_name() -> String {
        "dynamic".to_string()
    }

    fn into_arg(
        self,
        registry: &TypeRegistry,
        param: &TypeRef,
        index: usize,
    ) -> Result<Value, InvokeError> {
        convert_argument(registry, param, self, index)
    }
}

/// An argument slot that does not satisfy its declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMismatch {
    /// Position of the offending slot
    pub index: usize,
    /// Static type the pack provides there
    pub provided: String,
}

/// A typed factory argument tuple, one implementation per supported arity.
pub trait ArgPack: Send + Sync + 'static {
    /// Number of argument slots.
    const ARITY: usize;

    /// Check every slot against the declared parameter types.
    /// `params` must have exactly `ARITY` elements.
    fn check(params: &[TypeRef]) -> Result<(), SlotMismatch>;

    /// Convert the tuple into ordered dynamic arguments, resolving dynamic
    /// slots against the declared parameter types.
    fn into_values(
        self,
        registry: &TypeRegistry,
        params: &[TypeRef],
    ) -> Result<Vec<Value>, InvokeError>;
}

macro_rules! impl_arg_pack {
    ($arity:expr; $($name:ident => $idx:tt),*) => {
        impl<$($name: FactoryArg),*> ArgPack for ($($name,)*) {
            const ARITY: usize = $arity;

            fn check(params: &[TypeRef]) -> Result<(), SlotMismatch> {
                let _ = params;
                $(
                    if !$name::matches(&params[$idx]) {
                        return Err(SlotMismatch {
                            index: $idx,
                            provided: $name::type_name(),
                        });
                    }
                )*
                Ok(())
            }

            #[allow(non_snake_case)]
            fn into_values(
                self,
                registry: &TypeRegistry,
                params: &[TypeRef],
            ) -> Result<Vec<Value>, InvokeError> {
                let _ = (registry, params);
                let ($($name,)*) = self;
                Ok(vec![$($name.into_arg(registry, &params[$idx], $idx)?),*])
            }
        }
    };
}

impl_arg_pack!(0;);
impl_arg_pack!(1; A0 => 0);
impl_arg_pack!(2; A0 => 0, A1 => 1);
impl_arg_pack!(3; A0 => 0, A1 => 1, A2 => 2);
impl_arg_pack!(4; A0 => 0, A1 => 1, A2 => 2, A3 => 3);
impl_arg_pack!(5; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4);
impl_arg_pack!(6; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5);
impl_arg_pack!(7; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6);
impl_arg_pack!(8; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7);
impl_arg_pack!(9; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8);
impl_arg_pack!(10; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9);
impl_arg_pack!(11; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10);
impl_arg_pack!(12; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10, A11 => 11);
impl_arg_pack!(13; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10, A11 => 11, A12 => 12);
impl_arg_pack!(14; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10, A11 => 11, A12 => 12, A13 => 13);
impl_arg_pack!(15; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10, A11 => 11, A12 => 12, A13 => 13, A14 => 14);
impl_arg_pack!(16; A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7,
    A8 => 8, A9 => 9, A10 => 10, A11 => 11, A12 => 12, A13 => 13, A14 => 14, A15 => 15);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_round_trip() {
        assert_eq!(i32::from_value(42i32.into_value()), Some(42));
        assert_eq!(bool::from_value(true.into_value()), Some(true));
        assert_eq!(f64::from_value(Value::F64(1.25)), Some(1.25));
        // exact kind only, no widening
        assert_eq!(i64::from_value(Value::I32(1)), None);
    }

    #[test]
    fn test_str_native_value() {
        let s: Arc<str> = Arc::from("hi");
        let boxed = s.clone().into_value();
        assert_eq!(boxed, Value::str("hi"));
        assert_eq!(<Arc<str>>::from_value(boxed).as_deref(), Some("hi"));
    }

    #[test]
    fn test_pack_check_exact_match() {
        let params = vec![TypeRef::I32, TypeRef::Str];
        assert!(<(i32, Arc<str>)>::check(&params).is_ok());
        let err = <(i32, i32)>::check(&params).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.provided, "i32");
    }

    #[test]
    fn test_dynamic_slot_matches_anything() {
        let params = vec![TypeRef::I32, TypeRef::Str];
        assert!(<(Value, Value)>::check(&params).is_ok());
        assert!(<(Value, Arc<str>)>::check(&params).is_ok());
    }

    #[test]
    fn test_dynamic_slot_converts_at_invocation() {
        let registry = TypeRegistry::new();
        let params = vec![TypeRef::I32];
        let ok = (Value::I32(7),).into_values(&registry, &params).unwrap();
        assert_eq!(ok, vec![Value::I32(7)]);

        let err = (Value::str("no"),)
            .into_values(&registry, &params)
            .unwrap_err();
        assert!(matches!(err, InvokeError::ArgumentCast { index: 0, .. }));
    }

    #[test]
    fn test_arity_constants() {
        assert_eq!(<() as ArgPack>::ARITY, 0);
        assert_eq!(<(i32,) as ArgPack>::ARITY, 1);
        assert_eq!(
            <(
                i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32
            ) as ArgPack>::ARITY,
            16
        );
    }
}
