//! Invoker synthesis
//!
//! Builds specialized closures over resolved member descriptors: constructor
//! factories, property getters and setters (untyped and typed), and array
//! allocators. Descriptor resolution, holder indirection, static dispatch,
//! and boxing decisions are all folded in at compilation time; the returned
//! invoker touches the registry only for checks that depend on runtime
//! values (instance narrowing, reference casts).

use std::sync::Arc;

use mirra_model::{
    ArrayRef, ClassEntry, ClassId, ClassKind, ConstructorDef, ConstructorId, ObjectRef,
    PropertyDef, PropertyId, TypeRef, TypeRegistry, Value,
};

use crate::convention::{ArgPack, NativeValue};
use crate::error::{InvokeError, InvokeResult, ReflectError, ReflectResult};
use crate::holder;
use crate::tables::{
    cast_reference, convert_argument, is_value_type, unbox_exact, zero_value, MAX_TYPED_ARITY,
};

/// Untyped getter: instance in, boxed value out.
pub type UntypedGetter = Arc<dyn Fn(&Value) -> InvokeResult<Value> + Send + Sync>;

/// Untyped setter: instance and boxed value in.
pub type UntypedSetter = Arc<dyn Fn(&Value, Value) -> InvokeResult<()> + Send + Sync>;

/// Untyped factory: ordered dynamic arguments in, boxed instance out.
pub type UntypedFactory = Arc<dyn Fn(&[Value]) -> InvokeResult<Value> + Send + Sync>;

/// Array allocator: length in, zero-initialized array out.
pub type ArrayAllocator = Arc<dyn Fn(usize) -> ArrayRef + Send + Sync>;

/// Typed getter: native member value out, no boxing.
pub type TypedGetter<M> = Arc<dyn Fn(&ObjectRef) -> InvokeResult<M> + Send + Sync>;

/// Typed setter: native member value in, no absent-value branch.
pub type TypedSetter<M> = Arc<dyn Fn(&ObjectRef, M) -> InvokeResult<()> + Send + Sync>;

/// Typed factory for one argument-tuple shape.
pub type TypedFactory<A> = Arc<dyn Fn(A) -> InvokeResult<ObjectRef> + Send + Sync>;

/// Resolved view of a property request: the declared (outer) property, the
/// accessor target (the holder's inner property when indirected), and the
/// owning class entry.
#[derive(Clone)]
pub(crate) struct PropertyPlan {
    pub owner: ClassId,
    pub owner_name: String,
    pub entry: Arc<ClassEntry>,
    pub outer: PropertyDef,
    pub target: PropertyDef,
    pub held: bool,
}

/// Resolve a property descriptor, applying holder indirection when asked.
pub(crate) fn plan_property(
    registry: &TypeRegistry,
    property: PropertyId,
    indirect: bool,
) -> ReflectResult<PropertyPlan> {
    let entry = registry
        .class(property.owner)
        .ok_or(ReflectError::UnknownClass(property.owner))?;
    let outer = entry
        .property(property.index)
        .cloned()
        .ok_or_else(|| ReflectError::UnknownMember {
            class: entry.def.name.clone(),
            index: property.index,
        })?;

    let binding = if indirect {
        holder::resolve(registry, &outer)
    } else {
        None
    };
    let (target, held) = match &binding {
        Some(b) => {
            let inner = registry.property_def(b.value_property).ok_or_else(|| {
                ReflectError::UnknownMember {
                    class: entry.def.name.clone(),
                    index: b.value_property.index,
                }
            })?;
            (inner, true)
        }
        None => (outer.clone(), false),
    };

    Ok(PropertyPlan {
        owner: property.owner,
        owner_name: entry.def.name.clone(),
        entry,
        outer,
        target,
        held,
    })
}

/// Resolve a constructor descriptor.
pub(crate) fn plan_constructor(
    registry: &TypeRegistry,
    ctor: ConstructorId,
) -> ReflectResult<(Arc<ClassEntry>, ConstructorDef)> {
    let entry = registry
        .class(ctor.owner)
        .ok_or(ReflectError::UnknownClass(ctor.owner))?;
    let def = entry
        .constructor(ctor.index)
        .cloned()
        .ok_or_else(|| ReflectError::UnknownMember {
            class: entry.def.name.clone(),
            index: ctor.index,
        })?;
    Ok((entry, def))
}

fn cast_instance(
    registry: &TypeRegistry,
    instance: &Value,
    owner: ClassId,
    owner_name: &str,
) -> InvokeResult<ObjectRef> {
    match instance {
        Value::Null => Err(InvokeError::NullInstance),
        Value::Object(obj) if registry.is_instance_of(obj.class_id(), owner) => Ok(obj.clone()),
        _ => Err(InvokeError::InstanceCast {
            expected: owner_name.to_string(),
        }),
    }
}

fn store_field(obj: &ObjectRef, slot: u32, value: Value) -> InvokeResult<()> {
    if obj.set_field(slot, value) {
        Ok(())
    } else {
        Err(InvokeError::MissingSlot { slot })
    }
}

fn store_static(entry: &ClassEntry, slot: u32, value: Value) -> InvokeResult<()> {
    if entry.set_static_field(slot, value) {
        Ok(())
    } else {
        Err(InvokeError::MissingSlot { slot })
    }
}

fn expect_holder(raw: Value, property: &str) -> InvokeResult<ObjectRef> {
    match raw {
        Value::Null => Err(InvokeError::NullHolder {
            property: property.to_string(),
        }),
        Value::Object(obj) => Ok(obj),
        _ => Err(InvokeError::InvalidHolder {
            property: property.to_string(),
        }),
    }
}

fn is_struct(registry: &TypeRegistry, ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Class(id) => matches!(
            registry.class(*id).map(|entry| entry.def.kind),
            Some(ClassKind::Struct)
        ),
        _ => false,
    }
}

fn check_holder_readable(plan: &PropertyPlan) -> ReflectResult<()> {
    // the holder reference must be obtainable before reaching inside it
    if plan.held && !plan.outer.readable {
        return Err(ReflectError::HolderNotReadable {
            property: plan.outer.name.clone(),
        });
    }
    Ok(())
}

/// Verify a typed request's owner and member types against the resolved
/// member. Strict nominal equality: a subclass owner is a mismatch.
pub(crate) fn check_typed_request<M: NativeValue>(
    registry: &TypeRegistry,
    plan: &PropertyPlan,
    owner: ClassId,
) -> ReflectResult<()> {
    if plan.owner != owner {
        return Err(ReflectError::TypeMismatch {
            member: plan.outer.name.clone(),
            expected: plan.owner_name.clone(),
            requested: registry
                .class_name(owner)
                .unwrap_or_else(|| format!("class#{}", owner.0)),
        });
    }
    if plan.target.ty != M::type_ref() {
        return Err(ReflectError::TypeMismatch {
            member: plan.outer.name.clone(),
            expected: plan.target.ty.to_string(),
            requested: M::type_ref().to_string(),
        });
    }
    Ok(())
}

/// Synthesize an untyped getter. `Ok(None)` means the target is not
/// readable: the caller must treat the property as write-only.
pub(crate) fn compile_untyped_getter(
    registry: Arc<TypeRegistry>,
    plan: PropertyPlan,
) -> ReflectResult<Option<UntypedGetter>> {
    check_holder_readable(&plan)?;
    if !plan.target.readable {
        return Ok(None);
    }

    let PropertyPlan {
        owner,
        owner_name,
        entry,
        outer,
        target,
        held,
    } = plan;
    let struct_copy = is_struct(&registry, &target.ty);

    Ok(Some(Arc::new(move |instance: &Value| {
        let raw = if outer.is_static {
            entry.static_field(outer.slot).unwrap_or(Value::Null)
        } else {
            cast_instance(&registry, instance, owner, &owner_name)?
                .field(outer.slot)
                .unwrap_or(Value::Null)
        };
        let value = if held {
            expect_holder(raw, &outer.name)?
                .field(target.slot)
                .unwrap_or(Value::Null)
        } else {
            raw
        };
        // boxing a struct member copies it out of the instance
        if struct_copy {
            if let Value::Object(obj) = &value {
                return Ok(Value::Object(obj.duplicate()));
            }
        }
        Ok(value)
    })))
}

/// Synthesize an untyped setter. `Ok(None)` means the target is not
/// writable. An absent (null) value written to a value-typed member takes
/// the member's zero representation; reference-typed members get a checked
/// narrowing instead, deferred to invocation time.
pub(crate) fn compile_untyped_setter(
    registry: Arc<TypeRegistry>,
    plan: PropertyPlan,
) -> ReflectResult<Option<UntypedSetter>> {
    check_holder_readable(&plan)?;
    if !plan.target.writable {
        return Ok(None);
    }

    let PropertyPlan {
        owner,
        owner_name,
        entry,
        outer,
        target,
        held,
    } = plan;
    let value_typed = is_value_type(&registry, &target.ty);

    Ok(Some(Arc::new(move |instance: &Value, value: Value| {
        let converted = if value_typed {
            if value.is_null() {
                zero_value(&registry, &target.ty)
            } else {
                unbox_exact(&target.ty, value)?
            }
        } else {
            cast_reference(&registry, &target.ty, value)?
        };

        if held {
            let raw = if outer.is_static {
                entry.static_field(outer.slot).unwrap_or(Value::Null)
            } else {
                cast_instance(&registry, instance, owner, &owner_name)?
                    .field(outer.slot)
                    .unwrap_or(Value::Null)
            };
            store_field(&expect_holder(raw, &outer.name)?, target.slot, converted)
        } else if target.is_static {
            store_static(&entry, target.slot, converted)
        } else {
            let obj = cast_instance(&registry, instance, owner, &owner_name)?;
            store_field(&obj, target.slot, converted)
        }
    })))
}

/// Synthesize a typed getter. The owner/member agreement must have been
/// checked by `check_typed_request` before compilation.
pub(crate) fn compile_typed_getter<M: NativeValue>(
    registry: Arc<TypeRegistry>,
    plan: PropertyPlan,
) -> ReflectResult<Option<TypedGetter<M>>> {
    check_holder_readable(&plan)?;
    if !plan.target.readable {
        return Ok(None);
    }

    let PropertyPlan {
        owner,
        owner_name,
        entry,
        outer,
        target,
        held,
    } = plan;

    Ok(Some(Arc::new(move |instance: &ObjectRef| {
        let raw = if outer.is_static {
            entry.static_field(outer.slot).unwrap_or(Value::Null)
        } else {
            if !registry.is_instance_of(instance.class_id(), owner) {
                return Err(InvokeError::InstanceCast {
                    expected: owner_name.clone(),
                });
            }
            instance.field(outer.slot).unwrap_or(Value::Null)
        };
        let raw = if held {
            expect_holder(raw, &outer.name)?
                .field(target.slot)
                .unwrap_or(Value::Null)
        } else {
            raw
        };
        let actual = raw.kind_name();
        M::from_value(raw).ok_or_else(|| InvokeError::ValueCast {
            expected: M::type_ref().to_string(),
            actual: actual.to_string(),
        })
    })))
}

/// Synthesize a typed setter. The native calling convention cannot express
/// an absent value, so there is no zero branch here by design.
pub(crate) fn compile_typed_setter<M: NativeValue>(
    registry: Arc<TypeRegistry>,
    plan: PropertyPlan,
) -> ReflectResult<Option<TypedSetter<M>>> {
    check_holder_readable(&plan)?;
    if !plan.target.writable {
        return Ok(None);
    }

    let PropertyPlan {
        owner,
        owner_name,
        entry,
        outer,
        target,
        held,
    } = plan;

    Ok(Some(Arc::new(move |instance: &ObjectRef, value: M| {
        let converted = value.into_value();
        if held {
            let raw = if outer.is_static {
                entry.static_field(outer.slot).unwrap_or(Value::Null)
            } else {
                if !registry.is_instance_of(instance.class_id(), owner) {
                    return Err(InvokeError::InstanceCast {
                        expected: owner_name.clone(),
                    });
                }
                instance.field(outer.slot).unwrap_or(Value::Null)
            };
            store_field(&expect_holder(raw, &outer.name)?, target.slot, converted)
        } else if target.is_static {
            store_static(&entry, target.slot, converted)
        } else {
            if !registry.is_instance_of(instance.class_id(), owner) {
                return Err(InvokeError::InstanceCast {
                    expected: owner_name.clone(),
                });
            }
            store_field(instance, target.slot, converted)
        }
    })))
}

/// Build a zero-initialized instance and apply the constructor's slot
/// assignments. `args` must already be converted and of the declared count.
fn instantiate(
    registry: &TypeRegistry,
    entry: &ClassEntry,
    def: &ConstructorDef,
    args: Vec<Value>,
) -> ObjectRef {
    let mut fields = vec![Value::Null; entry.def.field_count];
    for prop in entry.def.properties.iter().filter(|p| !p.is_static) {
        fields[prop.slot as usize] = zero_value(registry, &prop.ty);
    }
    for assign in &def.assignments {
        fields[assign.slot as usize] = args[assign.param].clone();
    }
    ObjectRef::from_fields(entry.id, fields)
}

/// Synthesize an untyped factory: each positional argument is converted to
/// its declared parameter type, and the constructed instance is boxed.
pub(crate) fn compile_untyped_factory(
    registry: Arc<TypeRegistry>,
    ctor: ConstructorId,
) -> ReflectResult<UntypedFactory> {
    let (entry, def) = plan_constructor(&registry, ctor)?;
    let param_types: Vec<TypeRef> = def.params.iter().map(|p| p.ty.clone()).collect();

    Ok(Arc::new(move |args: &[Value]| {
        if args.len() != param_types.len() {
            return Err(InvokeError::ArgumentCount {
                expected: param_types.len(),
                actual: args.len(),
            });
        }
        let mut converted = Vec::with_capacity(args.len());
        for (index, (arg, ty)) in args.iter().zip(&param_types).enumerate() {
            converted.push(convert_argument(&registry, ty, arg.clone(), index)?);
        }
        Ok(Value::Object(instantiate(
            &registry, &entry, &def, converted,
        )))
    }))
}

/// Synthesize a typed factory for one argument-tuple shape.
///
/// Fails with `UnsupportedArity` beyond the fixed maximum, and with
/// `TypeMismatch` when the tuple's arity or slot types disagree with the
/// constructor's signature. Dynamic (`Value`) slots are converted at
/// invocation time like untyped factory arguments.
pub(crate) fn compile_typed_factory<A: ArgPack>(
    registry: Arc<TypeRegistry>,
    ctor: ConstructorId,
) -> ReflectResult<TypedFactory<A>> {
    let (entry, def) = plan_constructor(&registry, ctor)?;
    let arity = def.params.len();
    if arity > MAX_TYPED_ARITY {
        return Err(ReflectError::UnsupportedArity {
            arity,
            max: MAX_TYPED_ARITY,
        });
    }
    if entry.def.kind != ClassKind::Reference {
        return Err(ReflectError::TypeMismatch {
            member: entry.def.name.clone(),
            expected: "a reference class".to_string(),
            requested: "typed construction of a value class".to_string(),
        });
    }
    if A::ARITY != arity {
        return Err(ReflectError::TypeMismatch {
            member: entry.def.name.clone(),
            expected: format!("{} parameters", arity),
            requested: format!("{} parameters", A::ARITY),
        });
    }
    let param_types: Vec<TypeRef> = def.params.iter().map(|p| p.ty.clone()).collect();
    if let Err(mismatch) = A::check(&param_types) {
        return Err(ReflectError::TypeMismatch {
            member: def.params[mismatch.index].name.clone(),
            expected: param_types[mismatch.index].to_string(),
            requested: mismatch.provided,
        });
    }

    Ok(Arc::new(move |args: A| {
        let values = args.into_values(&registry, &param_types)?;
        Ok(instantiate(&registry, &entry, &def, values))
    }))
}

/// Synthesize an array allocator for an element type: length in, array of
/// per-element zero values out.
pub(crate) fn compile_array_allocator(
    registry: Arc<TypeRegistry>,
    elem: TypeRef,
) -> ArrayAllocator {
    Arc::new(move |len: usize| {
        let items = (0..len).map(|_| zero_value(&registry, &elem)).collect();
        ArrayRef::new(elem.clone(), items)
    })
}
