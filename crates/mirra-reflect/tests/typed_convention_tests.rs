//! Integration tests for typed property accessors

use std::sync::Arc;

use mirra_model::{ClassDef, ObjectRef, TypeRef, TypeRegistry, Value};
use mirra_reflect::{DynamicAccessorFactory, InvokeError, ReflectError};

fn setup() -> (Arc<TypeRegistry>, DynamicAccessorFactory) {
    let registry = Arc::new(TypeRegistry::new());
    let factory = DynamicAccessorFactory::new(registry.clone());
    (registry, factory)
}

#[test]
fn test_typed_round_trip() {
    let (registry, factory) = setup();
    let person = registry.register(
        ClassDef::builder("Person")
            .property("name", TypeRef::Str)
            .property("age", TypeRef::I32)
            .build(),
    );

    let age = registry.find_property(person, "age").unwrap();
    let get = factory
        .create_typed_getter::<i32>(age, person)
        .unwrap()
        .unwrap();
    let set = factory
        .create_typed_setter::<i32>(age, person)
        .unwrap()
        .unwrap();

    let instance = ObjectRef::from_fields(person, vec![Value::Null, Value::I32(30)]);
    assert_eq!(get(&instance).unwrap(), 30);
    set(&instance, 31).unwrap();
    assert_eq!(get(&instance).unwrap(), 31);
    // the write went through without boxing detours
    assert_eq!(instance.field(1), Some(Value::I32(31)));

    let name = registry.find_property(person, "name").unwrap();
    let set_name = factory
        .create_typed_setter::<Arc<str>>(name, person)
        .unwrap()
        .unwrap();
    set_name(&instance, Arc::from("Barbara")).unwrap();
    let get_name = factory
        .create_typed_getter::<Arc<str>>(name, person)
        .unwrap()
        .unwrap();
    assert_eq!(&*get_name(&instance).unwrap(), "Barbara");
}

#[test]
fn test_wrong_member_type_is_a_request_error() {
    let (registry, factory) = setup();
    let person = registry.register(
        ClassDef::builder("Person")
            .property("age", TypeRef::I32)
            .build(),
    );
    let age = registry.find_property(person, "age").unwrap();

    let err = factory.create_typed_getter::<i64>(age, person).err().unwrap();
    assert_eq!(
        err,
        ReflectError::TypeMismatch {
            member: "age".to_string(),
            expected: "i32".to_string(),
            requested: "i64".to_string(),
        }
    );
    assert!(factory.create_typed_setter::<bool>(age, person).is_err());
}

#[test]
fn test_subclass_owner_request_is_a_mismatch() {
    let (registry, factory) = setup();
    let base = registry.register(
        ClassDef::builder("Base")
            .property("x", TypeRef::I32)
            .build(),
    );
    let derived = registry.register(ClassDef::builder("Derived").parent(base).build());

    let x = registry.find_property(base, "x").unwrap();
    // requesting through the subclass is strict-nominal rejected...
    assert!(matches!(
        factory.create_typed_getter::<i32>(x, derived).err().unwrap(),
        ReflectError::TypeMismatch { .. }
    ));

    // ...but a subclass instance is narrowed fine at invocation time
    let get = factory.create_typed_getter::<i32>(x, base).unwrap().unwrap();
    let instance = ObjectRef::from_fields(derived, vec![Value::I32(4)]);
    assert_eq!(get(&instance).unwrap(), 4);
}

#[test]
fn test_instance_cast_at_invocation() {
    let (registry, factory) = setup();
    let a = registry.register(ClassDef::builder("A").property("x", TypeRef::I32).build());
    let b = registry.register(ClassDef::builder("B").build());

    let x = registry.find_property(a, "x").unwrap();
    let get = factory.create_typed_getter::<i32>(x, a).unwrap().unwrap();
    let set = factory.create_typed_setter::<i32>(x, a).unwrap().unwrap();

    let foreign = ObjectRef::new(b, 0);
    assert_eq!(
        get(&foreign).unwrap_err(),
        InvokeError::InstanceCast {
            expected: "A".to_string()
        }
    );
    assert_eq!(
        set(&foreign, 1).unwrap_err(),
        InvokeError::InstanceCast {
            expected: "A".to_string()
        }
    );
}

#[test]
fn test_typed_accessors_through_holder() {
    let (registry, factory) = setup();
    let holder = registry.register(
        ClassDef::builder("IntHolder")
            .holds(TypeRef::I32)
            .property("value", TypeRef::I32)
            .build(),
    );
    let widget = registry.register(
        ClassDef::builder("Widget")
            .property("count", TypeRef::Class(holder))
            .build(),
    );

    let count = registry.find_property(widget, "count").unwrap();
    // the typed member type is the holder's inner type, not the holder class
    let get = factory
        .create_typed_getter::<i32>(count, widget)
        .unwrap()
        .unwrap();
    let set = factory
        .create_typed_setter::<i32>(count, widget)
        .unwrap()
        .unwrap();

    let held = ObjectRef::from_fields(holder, vec![Value::I32(10)]);
    let instance = ObjectRef::from_fields(widget, vec![Value::Object(held)]);
    assert_eq!(get(&instance).unwrap(), 10);
    set(&instance, 11).unwrap();
    assert_eq!(get(&instance).unwrap(), 11);

    let empty = ObjectRef::new(widget, 1);
    assert_eq!(
        get(&empty).unwrap_err(),
        InvokeError::NullHolder {
            property: "count".to_string()
        }
    );
}

#[test]
fn test_direct_typed_accessors_bypass_holder() {
    let (registry, factory) = setup();
    let holder = registry.register(
        ClassDef::builder("IntHolder")
            .holds(TypeRef::I32)
            .property("value", TypeRef::I32)
            .build(),
    );
    let widget = registry.register(
        ClassDef::builder("Widget")
            .property("count", TypeRef::Class(holder))
            .build(),
    );

    let count = registry.find_property(widget, "count").unwrap();
    // indirected, the member type is the holder's inner i32
    assert!(factory.create_typed_getter::<i32>(count, widget).is_ok());
    // direct, the member type is the holder class itself, which has no
    // native representation
    assert!(matches!(
        factory
            .create_typed_getter_direct::<i32>(count, widget)
            .err()
            .unwrap(),
        ReflectError::TypeMismatch { .. }
    ));
    assert!(matches!(
        factory
            .create_typed_setter_direct::<i32>(count, widget)
            .err()
            .unwrap(),
        ReflectError::TypeMismatch { .. }
    ));
}

#[test]
fn test_direct_typed_accessors_on_plain_property() {
    let (registry, factory) = setup();
    let person = registry.register(
        ClassDef::builder("Person")
            .property("age", TypeRef::I32)
            .build(),
    );

    let age = registry.find_property(person, "age").unwrap();
    let direct = factory
        .create_typed_getter_direct::<i32>(age, person)
        .unwrap()
        .unwrap();
    let indirect = factory
        .create_typed_getter::<i32>(age, person)
        .unwrap()
        .unwrap();
    // distinct cache tables even when the property is not held
    assert!(!Arc::ptr_eq(&direct, &indirect));

    let set = factory
        .create_typed_setter_direct::<i32>(age, person)
        .unwrap()
        .unwrap();
    let instance = ObjectRef::new(person, 1);
    set(&instance, 52).unwrap();
    assert_eq!(direct(&instance).unwrap(), 52);
    assert_eq!(indirect(&instance).unwrap(), 52);

    // the direct request is cached too
    let again = factory
        .create_typed_getter_direct::<i32>(age, person)
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&direct, &again));
}

#[test]
fn test_typed_write_to_undersized_instance_storage_is_an_error() {
    let (registry, factory) = setup();
    let class = registry.register(
        ClassDef::builder("Pair")
            .property("a", TypeRef::I32)
            .property("b", TypeRef::I32)
            .build(),
    );

    let b = registry.find_property(class, "b").unwrap();
    let set = factory.create_typed_setter::<i32>(b, class).unwrap().unwrap();

    let short = ObjectRef::new(class, 1);
    assert_eq!(
        set(&short, 7).unwrap_err(),
        InvokeError::MissingSlot { slot: 1 }
    );
}

#[test]
fn test_missing_accessors_are_absent() {
    let (registry, factory) = setup();
    let class = registry.register(
        ClassDef::builder("Mixed")
            .readonly_property("frozen", TypeRef::I32)
            .writeonly_property("sink", TypeRef::I32)
            .build(),
    );

    let frozen = registry.find_property(class, "frozen").unwrap();
    assert!(factory
        .create_typed_setter::<i32>(frozen, class)
        .unwrap()
        .is_none());
    let sink = registry.find_property(class, "sink").unwrap();
    assert!(factory
        .create_typed_getter::<i32>(sink, class)
        .unwrap()
        .is_none());
}

#[test]
fn test_typed_getter_on_unwritten_reference_member() {
    let (registry, factory) = setup();
    let person = registry.register(
        ClassDef::builder("Person")
            .property("name", TypeRef::Str)
            .build(),
    );

    let name = registry.find_property(person, "name").unwrap();
    let get = factory
        .create_typed_getter::<Arc<str>>(name, person)
        .unwrap()
        .unwrap();

    // the native convention has no representation for an absent string
    let instance = ObjectRef::new(person, 1);
    assert_eq!(
        get(&instance).unwrap_err(),
        InvokeError::ValueCast {
            expected: "str".to_string(),
            actual: "null".to_string(),
        }
    );
}
