//! Value-holder resolution
//!
//! A property whose declared type is a class exposing the value-holder
//! capability is accessed through the holder's inner `value` property
//! instead of directly. Resolution is a pure function of registered type
//! information; the result is folded into the compiled invoker.

use mirra_model::{PropertyDef, PropertyId, TypeRef, TypeRegistry};

/// Conventional name of the holder's inner property.
pub const VALUE_PROPERTY: &str = "value";

/// A matched holder capability instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderType {
    /// The holder class (the property's declared type)
    pub class: mirra_model::ClassId,
    /// The capability's type argument
    pub inner: TypeRef,
}

/// Fully resolved indirection for a held property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderBinding {
    /// The matched capability
    pub holder: HolderType,
    /// Descriptor of the holder's `value` property
    pub value_property: PropertyId,
}

/// Find the holder capability instantiation for a property's declared type.
///
/// Returns the first capability declared on the class or, failing that, on
/// its nearest ancestor. A class declaring more than one instantiation is
/// not disambiguated: the first wins.
pub fn find_holder_type(registry: &TypeRegistry, property: &PropertyDef) -> Option<HolderType> {
    let TypeRef::Class(declared) = &property.ty else {
        return None;
    };
    let mut cursor = Some(*declared);
    while let Some(id) = cursor {
        let entry = registry.class(id)?;
        if let Some(inner) = entry.def.holds.first() {
            return Some(HolderType {
                class: *declared,
                inner: inner.clone(),
            });
        }
        cursor = entry.def.parent;
    }
    None
}

/// Resolve the holder's inner `value` property, searching the holder class
/// and then its ancestors.
pub fn value_property(registry: &TypeRegistry, holder: &HolderType) -> Option<PropertyId> {
    let mut cursor = Some(holder.class);
    while let Some(id) = cursor {
        if let Some(pid) = registry.find_property(id, VALUE_PROPERTY) {
            return Some(pid);
        }
        cursor = registry.class(id)?.def.parent;
    }
    None
}

/// Resolve a property's holder indirection end to end, if any.
///
/// Returns `None` both when the declared type carries no holder capability
/// and when a capability is declared but the class exposes no `value`
/// property (a malformed holder is treated as not-a-holder).
pub fn resolve(registry: &TypeRegistry, property: &PropertyDef) -> Option<HolderBinding> {
    let holder = find_holder_type(registry, property)?;
    let value_property = value_property(registry, &holder)?;
    Some(HolderBinding {
        holder,
        value_property,
    })
}
