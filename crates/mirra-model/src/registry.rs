//! Type registry
//!
//! The registry owns all registered classes for the life of the process.
//! Registration is append-only: a `ClassId` handed out once stays valid
//! forever, which is what lets member descriptors be plain identity tokens.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{ClassDef, ClassId, ConstructorDef, PropertyDef};
use crate::value::Value;

/// Identity token for a property: declaring class plus property index.
///
/// Used verbatim as a cache key by the accessor compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId {
    /// Declaring class
    pub owner: ClassId,
    /// Index into the class's property list
    pub index: u32,
}

/// Identity token for a constructor: declaring class plus constructor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructorId {
    /// Declaring class
    pub owner: ClassId,
    /// Index into the class's constructor list
    pub index: u32,
}

/// A registered class: its immutable definition plus static field storage.
pub struct ClassEntry {
    /// Assigned id
    pub id: ClassId,
    /// The definition as registered
    pub def: ClassDef,
    statics: RwLock<Box<[Value]>>,
}

impl ClassEntry {
    /// Look up a property by index.
    pub fn property(&self, index: u32) -> Option<&PropertyDef> {
        self.def.properties.get(index as usize)
    }

    /// Look up a constructor by index.
    pub fn constructor(&self, index: u32) -> Option<&ConstructorDef> {
        self.def.constructors.get(index as usize)
    }

    /// Read a static field slot.
    pub fn static_field(&self, slot: u32) -> Option<Value> {
        self.statics.read().get(slot as usize).cloned()
    }

    /// Write a static field slot. Returns false when out of bounds.
    pub fn set_static_field(&self, slot: u32, value: Value) -> bool {
        let mut statics = self.statics.write();
        match statics.get_mut(slot as usize) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

/// Process-wide registry of classes.
#[derive(Default)]
pub struct TypeRegistry {
    classes: RwLock<Vec<Arc<ClassEntry>>>,
    names: RwLock<FxHashMap<String, ClassId>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class definition, returning its id.
    ///
    /// Panics when the definition is internally inconsistent (slots or
    /// constructor assignments out of range, name already taken);
    /// registration is programmer setup, not runtime input.
    pub fn register(&self, def: ClassDef) -> ClassId {
        for prop in &def.properties {
            let bound = if prop.is_static {
                def.static_field_count
            } else {
                def.field_count
            };
            assert!(
                (prop.slot as usize) < bound,
                "property '{}' of class '{}' references slot {} out of range",
                prop.name,
                def.name,
                prop.slot
            );
        }
        for (i, ctor) in def.constructors.iter().enumerate() {
            for assign in &ctor.assignments {
                assert!(
                    (assign.slot as usize) < def.field_count,
                    "constructor {} of class '{}' assigns slot {} out of range",
                    i,
                    def.name,
                    assign.slot
                );
                assert!(
                    assign.param < ctor.params.len(),
                    "constructor {} of class '{}' references parameter {} out of range",
                    i,
                    def.name,
                    assign.param
                );
            }
        }

        let mut classes = self.classes.write();
        let mut names = self.names.write();
        assert!(
            !names.contains_key(&def.name),
            "class '{}' is already registered",
            def.name
        );
        let id = ClassId(classes.len() as u32);
        let statics = vec![Value::Null; def.static_field_count].into_boxed_slice();
        names.insert(def.name.clone(), id);
        classes.push(Arc::new(ClassEntry {
            id,
            def,
            statics: RwLock::new(statics),
        }));
        id
    }

    /// Look up a class entry by id.
    pub fn class(&self, id: ClassId) -> Option<Arc<ClassEntry>> {
        self.classes.read().get(id.0 as usize).cloned()
    }

    /// Look up a class id by name.
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.names.read().get(name).copied()
    }

    /// Name of a class, for diagnostics.
    pub fn class_name(&self, id: ClassId) -> Option<String> {
        self.class(id).map(|entry| entry.def.name.clone())
    }

    /// Whether `child` is `ancestor` or derives from it.
    pub fn is_instance_of(&self, child: ClassId, ancestor: ClassId) -> bool {
        let mut cursor = Some(child);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.class(id).and_then(|entry| entry.def.parent);
        }
        false
    }

    /// Find a property by name on a class (not searching the parent chain).
    pub fn find_property(&self, class: ClassId, name: &str) -> Option<PropertyId> {
        let entry = self.class(class)?;
        entry
            .def
            .properties
            .iter()
            .position(|p| p.name == name)
            .map(|index| PropertyId {
                owner: class,
                index: index as u32,
            })
    }

    /// Resolve a property descriptor to its definition.
    pub fn property_def(&self, property: PropertyId) -> Option<PropertyDef> {
        self.class(property.owner)?
            .property(property.index)
            .cloned()
    }

    /// Descriptor for the `index`-th constructor of a class, if it exists.
    pub fn constructor_id(&self, class: ClassId, index: u32) -> Option<ConstructorId> {
        let entry = self.class(class)?;
        entry
            .constructor(index)
            .map(|_| ConstructorId { owner: class, index })
    }

    /// Resolve a constructor descriptor to its definition.
    pub fn constructor_def(&self, ctor: ConstructorId) -> Option<ConstructorDef> {
        self.class(ctor.owner)?.constructor(ctor.index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassDef, TypeRef};

    #[test]
    fn test_register_and_lookup() {
        let registry = TypeRegistry::new();
        let id = registry.register(
            ClassDef::builder("Person")
                .property("name", TypeRef::Str)
                .property("age", TypeRef::I32)
                .build(),
        );

        assert_eq!(registry.class_by_name("Person"), Some(id));
        assert_eq!(registry.class_name(id), Some("Person".to_string()));
        let entry = registry.class(id).unwrap();
        assert_eq!(entry.def.field_count, 2);
        assert!(registry.class(ClassId(99)).is_none());
    }

    #[test]
    fn test_find_property_returns_identity_token() {
        let registry = TypeRegistry::new();
        let id = registry.register(
            ClassDef::builder("Person")
                .property("name", TypeRef::Str)
                .property("age", TypeRef::I32)
                .build(),
        );

        let age = registry.find_property(id, "age").unwrap();
        assert_eq!(age.owner, id);
        assert_eq!(age.index, 1);
        assert_eq!(registry.property_def(age).unwrap().ty, TypeRef::I32);
        assert!(registry.find_property(id, "missing").is_none());
    }

    #[test]
    fn test_instance_of_walks_parent_chain() {
        let registry = TypeRegistry::new();
        let base = registry.register(ClassDef::builder("Base").build());
        let mid = registry.register(ClassDef::builder("Mid").parent(base).build());
        let leaf = registry.register(ClassDef::builder("Leaf").parent(mid).build());

        assert!(registry.is_instance_of(leaf, base));
        assert!(registry.is_instance_of(leaf, leaf));
        assert!(!registry.is_instance_of(base, leaf));
    }

    #[test]
    fn test_static_fields_start_null() {
        let registry = TypeRegistry::new();
        let id = registry.register(
            ClassDef::builder("Counter")
                .static_property("total", TypeRef::I64)
                .build(),
        );

        let entry = registry.class(id).unwrap();
        assert_eq!(entry.static_field(0), Some(Value::Null));
        assert!(entry.set_static_field(0, Value::I64(3)));
        assert_eq!(entry.static_field(0), Some(Value::I64(3)));
        assert!(!entry.set_static_field(1, Value::Null));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_register_rejects_duplicate_name() {
        let registry = TypeRegistry::new();
        registry.register(ClassDef::builder("Dup").build());
        registry.register(ClassDef::builder("Dup").build());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_register_rejects_bad_assignment() {
        let registry = TypeRegistry::new();
        registry.register(ClassDef {
            name: "Broken".to_string(),
            kind: crate::class::ClassKind::Reference,
            parent: None,
            field_count: 1,
            static_field_count: 0,
            properties: vec![],
            constructors: vec![crate::class::ConstructorDef {
                params: vec![],
                assignments: vec![crate::class::FieldAssignment { slot: 5, param: 0 }],
            }],
            holds: vec![],
        });
    }
}
