//! Accessor factories and the invoker caches
//!
//! `DynamicAccessorFactory` memoizes every synthesized invoker per member
//! descriptor. Lookups are concurrent and compilation happens outside the
//! map lock, so two racing requests may both compile; the first insertion
//! wins and becomes the canonical invoker for everyone. Absent accessors
//! (read-only or write-only members) are cached as absent; compilation
//! errors are never cached and surface again on the next request.
//!
//! `ReflectiveAccessorFactory` is the uncached fallback used when the probe
//! reports invoker synthesis unavailable: every request resolves and
//! compiles from scratch.

use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use mirra_model::{ClassId, ConstructorId, PropertyId, TypeRef, TypeRegistry};

use crate::compiler::{
    self, ArrayAllocator, TypedFactory, TypedGetter, TypedSetter, UntypedFactory, UntypedGetter,
    UntypedSetter,
};
use crate::convention::{ArgPack, NativeValue};
use crate::error::ReflectResult;
use crate::probe;

/// The accessor factory surface shared by all implementations.
///
/// Getters and setters come in two flavors: the plain operations apply
/// value-holder indirection when the property's declared type carries the
/// holder capability, the `_direct` operations never do. `Ok(None)` from a
/// getter or setter request means the member lacks that accessor.
pub trait AccessorFactory: Send + Sync {
    /// Factory invoker for a constructor.
    fn create_factory(&self, ctor: ConstructorId) -> ReflectResult<UntypedFactory>;

    /// Allocator for arrays of the given element type.
    fn create_array_allocator(&self, elem: TypeRef) -> ArrayAllocator;

    /// Getter with value-holder indirection.
    fn create_getter(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>>;

    /// Getter without value-holder indirection.
    fn create_getter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>>;

    /// Setter with value-holder indirection.
    fn create_setter(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>>;

    /// Setter without value-holder indirection.
    fn create_setter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>>;

    /// The type a property exposes through its accessors: the holder's
    /// inner type for held properties, the declared type otherwise.
    fn extended_member_type(&self, property: PropertyId) -> ReflectResult<TypeRef>;
}

type AnySlot = Arc<dyn Any + Send + Sync>;

/// Look up or insert under the non-single-flight discipline: compile outside
/// the lock, let the first insertion win.
fn get_or_compile<K, V, F>(map: &DashMap<K, V>, key: K, compile: F) -> ReflectResult<V>
where
    K: Eq + Hash,
    V: Clone,
    F: FnOnce() -> ReflectResult<V>,
{
    if let Some(hit) = map.get(&key) {
        return Ok(hit.clone());
    }
    let candidate = compile()?;
    Ok(map.entry(key).or_insert(candidate).clone())
}

/// The caching accessor factory.
///
/// Each invoker family has its own cache table keyed by member descriptor;
/// typed families additionally key on the requested native signature.
pub struct DynamicAccessorFactory {
    registry: Arc<TypeRegistry>,
    factories: DashMap<ConstructorId, UntypedFactory>,
    typed_factories: DashMap<(ConstructorId, TypeId), AnySlot>,
    array_allocators: DashMap<TypeRef, ArrayAllocator>,
    getters: DashMap<PropertyId, Option<UntypedGetter>>,
    getters_direct: DashMap<PropertyId, Option<UntypedGetter>>,
    setters: DashMap<PropertyId, Option<UntypedSetter>>,
    setters_direct: DashMap<PropertyId, Option<UntypedSetter>>,
    typed_getters: DashMap<(PropertyId, TypeId), Option<AnySlot>>,
    typed_getters_direct: DashMap<(PropertyId, TypeId), Option<AnySlot>>,
    typed_setters: DashMap<(PropertyId, TypeId), Option<AnySlot>>,
    typed_setters_direct: DashMap<(PropertyId, TypeId), Option<AnySlot>>,
    extended_types: DashMap<PropertyId, TypeRef>,
}

impl DynamicAccessorFactory {
    /// Create a factory over a registry. Caches start empty.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            factories: DashMap::new(),
            typed_factories: DashMap::new(),
            array_allocators: DashMap::new(),
            getters: DashMap::new(),
            getters_direct: DashMap::new(),
            setters: DashMap::new(),
            setters_direct: DashMap::new(),
            typed_getters: DashMap::new(),
            typed_getters_direct: DashMap::new(),
            typed_setters: DashMap::new(),
            typed_setters_direct: DashMap::new(),
            extended_types: DashMap::new(),
        }
    }

    /// The registry this factory compiles against.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Typed factory invoker for a constructor, specialized to the argument
    /// tuple `A`. Signature agreement is checked at request time; a `Value`
    /// element in `A` is the dynamic slot, converted per call.
    pub fn create_typed_factory<A: ArgPack>(
        &self,
        ctor: ConstructorId,
    ) -> ReflectResult<TypedFactory<A>> {
        let key = (ctor, TypeId::of::<A>());
        if let Some(hit) = self.typed_factories.get(&key) {
            if let Some(factory) = hit.downcast_ref::<TypedFactory<A>>() {
                return Ok(factory.clone());
            }
        }
        let candidate = compiler::compile_typed_factory::<A>(self.registry.clone(), ctor)?;
        let stored = self
            .typed_factories
            .entry(key)
            .or_insert_with(|| Arc::new(candidate.clone()) as AnySlot)
            .clone();
        Ok(stored
            .downcast_ref::<TypedFactory<A>>()
            .cloned()
            .unwrap_or(candidate))
    }

    /// Typed getter for a property, specialized to the native member type
    /// `M` and checked against the requested owner class. The owner must be
    /// the declaring class itself; a subclass is a mismatch, even though the
    /// compiled invoker accepts subclass instances at invocation time.
    /// Value-holder indirection applies as in `create_getter`.
    pub fn create_typed_getter<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedGetter<M>>> {
        self.typed_getter_in::<M>(&self.typed_getters, property, owner, true)
    }

    /// Typed getter without value-holder indirection; `M` is checked
    /// against the property's declared type itself.
    pub fn create_typed_getter_direct<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedGetter<M>>> {
        self.typed_getter_in::<M>(&self.typed_getters_direct, property, owner, false)
    }

    /// Typed setter counterpart of `create_typed_getter`.
    pub fn create_typed_setter<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedSetter<M>>> {
        self.typed_setter_in::<M>(&self.typed_setters, property, owner, true)
    }

    /// Typed setter without value-holder indirection.
    pub fn create_typed_setter_direct<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedSetter<M>>> {
        self.typed_setter_in::<M>(&self.typed_setters_direct, property, owner, false)
    }

    fn typed_getter_in<M: NativeValue>(
        &self,
        table: &DashMap<(PropertyId, TypeId), Option<AnySlot>>,
        property: PropertyId,
        owner: ClassId,
        indirect: bool,
    ) -> ReflectResult<Option<TypedGetter<M>>> {
        let key = (property, TypeId::of::<M>());
        let plan = compiler::plan_property(&self.registry, property, indirect)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        if let Some(hit) = table.get(&key) {
            return Ok(hit
                .as_ref()
                .and_then(|slot| slot.downcast_ref::<TypedGetter<M>>().cloned()));
        }
        let candidate = compiler::compile_typed_getter::<M>(self.registry.clone(), plan)?;
        let stored = table
            .entry(key)
            .or_insert_with(|| candidate.clone().map(|g| Arc::new(g) as AnySlot))
            .clone();
        Ok(stored
            .and_then(|slot| slot.downcast_ref::<TypedGetter<M>>().cloned())
            .or(candidate))
    }

    fn typed_setter_in<M: NativeValue>(
        &self,
        table: &DashMap<(PropertyId, TypeId), Option<AnySlot>>,
        property: PropertyId,
        owner: ClassId,
        indirect: bool,
    ) -> ReflectResult<Option<TypedSetter<M>>> {
        let key = (property, TypeId::of::<M>());
        let plan = compiler::plan_property(&self.registry, property, indirect)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        if let Some(hit) = table.get(&key) {
            return Ok(hit
                .as_ref()
                .and_then(|slot| slot.downcast_ref::<TypedSetter<M>>().cloned()));
        }
        let candidate = compiler::compile_typed_setter::<M>(self.registry.clone(), plan)?;
        let stored = table
            .entry(key)
            .or_insert_with(|| candidate.clone().map(|s| Arc::new(s) as AnySlot))
            .clone();
        Ok(stored
            .and_then(|slot| slot.downcast_ref::<TypedSetter<M>>().cloned())
            .or(candidate))
    }
}

impl AccessorFactory for DynamicAccessorFactory {
    fn create_factory(&self, ctor: ConstructorId) -> ReflectResult<UntypedFactory> {
        get_or_compile(&self.factories, ctor, || {
            compiler::compile_untyped_factory(self.registry.clone(), ctor)
        })
    }

    fn create_array_allocator(&self, elem: TypeRef) -> ArrayAllocator {
        if let Some(hit) = self.array_allocators.get(&elem) {
            return hit.clone();
        }
        let candidate = compiler::compile_array_allocator(self.registry.clone(), elem.clone());
        self.array_allocators
            .entry(elem)
            .or_insert(candidate)
            .clone()
    }

    fn create_getter(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>> {
        get_or_compile(&self.getters, property, || {
            let plan = compiler::plan_property(&self.registry, property, true)?;
            compiler::compile_untyped_getter(self.registry.clone(), plan)
        })
    }

    fn create_getter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>> {
        get_or_compile(&self.getters_direct, property, || {
            let plan = compiler::plan_property(&self.registry, property, false)?;
            compiler::compile_untyped_getter(self.registry.clone(), plan)
        })
    }

    fn create_setter(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>> {
        get_or_compile(&self.setters, property, || {
            let plan = compiler::plan_property(&self.registry, property, true)?;
            compiler::compile_untyped_setter(self.registry.clone(), plan)
        })
    }

    fn create_setter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>> {
        get_or_compile(&self.setters_direct, property, || {
            let plan = compiler::plan_property(&self.registry, property, false)?;
            compiler::compile_untyped_setter(self.registry.clone(), plan)
        })
    }

    fn extended_member_type(&self, property: PropertyId) -> ReflectResult<TypeRef> {
        get_or_compile(&self.extended_types, property, || {
            let plan = compiler::plan_property(&self.registry, property, true)?;
            Ok(plan.target.ty)
        })
    }
}

/// Uncached fallback factory: every request resolves the descriptor and
/// compiles a fresh invoker. Behavior matches `DynamicAccessorFactory`
/// except that no invoker is canonical.
pub struct ReflectiveAccessorFactory {
    registry: Arc<TypeRegistry>,
}

impl ReflectiveAccessorFactory {
    /// Create a fallback factory over a registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Typed factory invoker, compiled fresh per request.
    pub fn create_typed_factory<A: ArgPack>(
        &self,
        ctor: ConstructorId,
    ) -> ReflectResult<TypedFactory<A>> {
        compiler::compile_typed_factory::<A>(self.registry.clone(), ctor)
    }

    /// Typed getter, compiled fresh per request.
    pub fn create_typed_getter<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedGetter<M>>> {
        let plan = compiler::plan_property(&self.registry, property, true)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        compiler::compile_typed_getter::<M>(self.registry.clone(), plan)
    }

    /// Typed getter without value-holder indirection, compiled fresh.
    pub fn create_typed_getter_direct<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedGetter<M>>> {
        let plan = compiler::plan_property(&self.registry, property, false)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        compiler::compile_typed_getter::<M>(self.registry.clone(), plan)
    }

    /// Typed setter, compiled fresh per request.
    pub fn create_typed_setter<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedSetter<M>>> {
        let plan = compiler::plan_property(&self.registry, property, true)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        compiler::compile_typed_setter::<M>(self.registry.clone(), plan)
    }

    /// Typed setter without value-holder indirection, compiled fresh.
    pub fn create_typed_setter_direct<M: NativeValue>(
        &self,
        property: PropertyId,
        owner: ClassId,
    ) -> ReflectResult<Option<TypedSetter<M>>> {
        let plan = compiler::plan_property(&self.registry, property, false)?;
        compiler::check_typed_request::<M>(&self.registry, &plan, owner)?;
        compiler::compile_typed_setter::<M>(self.registry.clone(), plan)
    }
}

impl AccessorFactory for ReflectiveAccessorFactory {
    fn create_factory(&self, ctor: ConstructorId) -> ReflectResult<UntypedFactory> {
        compiler::compile_untyped_factory(self.registry.clone(), ctor)
    }

    fn create_array_allocator(&self, elem: TypeRef) -> ArrayAllocator {
        compiler::compile_array_allocator(self.registry.clone(), elem)
    }

    fn create_getter(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>> {
        let plan = compiler::plan_property(&self.registry, property, true)?;
        compiler::compile_untyped_getter(self.registry.clone(), plan)
    }

    fn create_getter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedGetter>> {
        let plan = compiler::plan_property(&self.registry, property, false)?;
        compiler::compile_untyped_getter(self.registry.clone(), plan)
    }

    fn create_setter(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>> {
        let plan = compiler::plan_property(&self.registry, property, true)?;
        compiler::compile_untyped_setter(self.registry.clone(), plan)
    }

    fn create_setter_direct(&self, property: PropertyId) -> ReflectResult<Option<UntypedSetter>> {
        let plan = compiler::plan_property(&self.registry, property, false)?;
        compiler::compile_untyped_setter(self.registry.clone(), plan)
    }

    fn extended_member_type(&self, property: PropertyId) -> ReflectResult<TypeRef> {
        let plan = compiler::plan_property(&self.registry, property, true)?;
        Ok(plan.target.ty)
    }
}

/// Pick the accessor factory for a registry: the caching synthesizing
/// factory when the capability probe passes, the uncached reflective
/// fallback otherwise.
pub fn default_factory(registry: Arc<TypeRegistry>) -> Arc<dyn AccessorFactory> {
    if probe::synthesis_available() {
        Arc::new(DynamicAccessorFactory::new(registry))
    } else {
        Arc::new(ReflectiveAccessorFactory::new(registry))
    }
}

// keep the trait object-safe
const _: Option<&dyn AccessorFactory> = None;

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_model::{ClassDef, ObjectRef, Value};

    fn person_registry() -> (Arc<TypeRegistry>, PropertyId, ConstructorId) {
        let registry = Arc::new(TypeRegistry::new());
        let person = registry.register(
            ClassDef::builder("Person")
                .property("name", TypeRef::Str)
                .property("age", TypeRef::I32)
                .positional_constructor()
                .build(),
        );
        let age = registry.find_property(person, "age").unwrap();
        let ctor = registry.constructor_id(person, 0).unwrap();
        (registry, age, ctor)
    }

    #[test]
    fn test_getter_is_cached_per_descriptor() {
        let (registry, age, ctor) = person_registry();
        let factory = DynamicAccessorFactory::new(registry);

        let a = factory.create_getter(age).unwrap().unwrap();
        let b = factory.create_getter(age).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let f1 = factory.create_factory(ctor).unwrap();
        let f2 = factory.create_factory(ctor).unwrap();
        assert!(Arc::ptr_eq(&f1, &f2));
    }

    #[test]
    fn test_direct_and_indirect_getters_are_distinct_entries() {
        let (registry, age, _) = person_registry();
        let factory = DynamicAccessorFactory::new(registry);

        let indirect = factory.create_getter(age).unwrap().unwrap();
        let direct = factory.create_getter_direct(age).unwrap().unwrap();
        // separate cache tables even for a non-held property
        assert!(!Arc::ptr_eq(&indirect, &direct));
    }

    #[test]
    fn test_typed_cache_keys_on_signature() {
        let (registry, age, _) = person_registry();
        let factory = DynamicAccessorFactory::new(registry);

        let a = factory
            .create_typed_getter::<i32>(age, age.owner)
            .unwrap()
            .unwrap();
        let b = factory
            .create_typed_getter::<i32>(age, age.owner)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // a wrong signature is rejected, and the rejection is not cached
        assert!(factory.create_typed_getter::<i64>(age, age.owner).is_err());
        assert!(factory.create_typed_getter::<i32>(age, age.owner).is_ok());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (registry, _, _) = person_registry();
        let factory = DynamicAccessorFactory::new(registry.clone());

        let bogus = PropertyId {
            owner: mirra_model::ClassId(99),
            index: 0,
        };
        assert!(factory.create_getter(bogus).is_err());
        assert!(factory.create_getter(bogus).is_err());
        assert!(factory.getters.is_empty());
    }

    #[test]
    fn test_array_allocator_cached_per_element_type() {
        let (registry, _, _) = person_registry();
        let factory = DynamicAccessorFactory::new(registry);

        let a = factory.create_array_allocator(TypeRef::I32);
        let b = factory.create_array_allocator(TypeRef::I32);
        assert!(Arc::ptr_eq(&a, &b));
        let c = factory.create_array_allocator(TypeRef::I64);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_reflective_factory_compiles_per_request() {
        let (registry, age, _) = person_registry();
        let factory = ReflectiveAccessorFactory::new(registry.clone());

        let a = factory.create_getter(age).unwrap().unwrap();
        let b = factory.create_getter(age).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let person = registry.class_by_name("Person").unwrap();
        let instance = Value::Object(ObjectRef::new(person, 2));
        assert!(a(&instance).is_ok());
    }
}
