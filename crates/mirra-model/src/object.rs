//! Heap objects and arrays
//!
//! Instances are shared by reference (`Arc`) with interior mutability on the
//! field storage. Equality is identity: two references are equal only when
//! they point at the same allocation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{ClassId, TypeRef};
use crate::value::Value;

/// Shared reference to a heap object.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectData>);

struct ObjectData {
    class: ClassId,
    fields: RwLock<Box<[Value]>>,
}

impl ObjectRef {
    /// Allocate an object with all fields set to `Value::Null`.
    pub fn new(class: ClassId, field_count: usize) -> Self {
        Self::from_fields(class, vec![Value::Null; field_count])
    }

    /// Allocate an object from prepared field values.
    pub fn from_fields(class: ClassId, fields: Vec<Value>) -> Self {
        ObjectRef(Arc::new(ObjectData {
            class,
            fields: RwLock::new(fields.into_boxed_slice()),
        }))
    }

    /// Class of this instance.
    pub fn class_id(&self) -> ClassId {
        self.0.class
    }

    /// Number of field slots.
    pub fn field_count(&self) -> usize {
        self.0.fields.read().len()
    }

    /// Read a field slot.
    pub fn field(&self, slot: u32) -> Option<Value> {
        self.0.fields.read().get(slot as usize).cloned()
    }

    /// Write a field slot. Returns false when the slot is out of bounds.
    pub fn set_field(&self, slot: u32, value: Value) -> bool {
        let mut fields = self.0.fields.write();
        match fields.get_mut(slot as usize) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Shallow copy: a fresh allocation with cloned field values. Used to
    /// give struct instances copy semantics at box/unbox boundaries.
    pub fn duplicate(&self) -> ObjectRef {
        ObjectRef::from_fields(self.0.class, self.0.fields.read().to_vec())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("class", &self.0.class)
            .field("fields", &*self.0.fields.read())
            .finish()
    }
}

/// Shared reference to a heap array.
#[derive(Clone)]
pub struct ArrayRef(Arc<ArrayData>);

struct ArrayData {
    elem: TypeRef,
    items: RwLock<Vec<Value>>,
}

impl ArrayRef {
    /// Allocate an array from prepared items.
    pub fn new(elem: TypeRef, items: Vec<Value>) -> Self {
        ArrayRef(Arc::new(ArrayData {
            elem,
            items: RwLock::new(items),
        }))
    }

    /// Element type.
    pub fn elem_type(&self) -> &TypeRef {
        &self.0.elem
    }

    /// Length of the array.
    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.read().get(index).cloned()
    }

    /// Write an element. Returns false when the index is out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut items = self.0.items.write();
        match items.get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArrayRef {}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRef")
            .field("elem", &self.0.elem)
            .field("items", &*self.0.items.read())
            .finish()
    }
}
