//! Synthesis capability probe
//!
//! Some execution environments forbid or break invoker synthesis. The probe
//! runs one end-to-end self-test (register a class, compile a factory and a
//! getter, round-trip a value) the first time anyone asks, and remembers the
//! verdict for the life of the process. A panic during the self-test counts
//! as unavailable.

use std::panic::catch_unwind;
use std::sync::Arc;

use mirra_model::{ClassDef, TypeRef, TypeRegistry, Value};
use once_cell::sync::Lazy;

use crate::factory::{AccessorFactory, DynamicAccessorFactory};

static SYNTHESIS_AVAILABLE: Lazy<bool> = Lazy::new(|| catch_unwind(self_test).unwrap_or(false));

fn self_test() -> bool {
    let registry = Arc::new(TypeRegistry::new());
    let class = registry.register(
        ClassDef::builder("__probe")
            .property("x", TypeRef::I32)
            .positional_constructor()
            .build(),
    );
    let factory = DynamicAccessorFactory::new(registry.clone());

    let ctor = match registry.constructor_id(class, 0) {
        Some(ctor) => ctor,
        None => return false,
    };
    let make = match factory.create_factory(ctor) {
        Ok(make) => make,
        Err(_) => return false,
    };
    let instance = match make(&[Value::I32(7)]) {
        Ok(instance) => instance,
        Err(_) => return false,
    };

    let property = match registry.find_property(class, "x") {
        Some(property) => property,
        None => return false,
    };
    let get = match factory.create_getter(property) {
        Ok(Some(get)) => get,
        _ => return false,
    };
    matches!(get(&instance), Ok(Value::I32(7)))
}

/// Whether invoker synthesis works in this process. Probed once, then fixed.
pub fn synthesis_available() -> bool {
    *SYNTHESIS_AVAILABLE
}
