//! Capability model: which types are configurable, what they declare, and
//! how they relate to each other.
//!
//! The descriptor builder and the handler resolver only ever talk to the
//! [`CapabilityModel`] trait. [`TypeTable`] is the shipped implementation; hosts
//! with their own type registry can implement the trait directly.

pub mod identity;
pub mod table;
pub mod value;

pub use identity::{AttributeKey, HandlerId, TagName, TypeName, UNIVERSAL_TYPE};
pub use table::{AttributeDeclaration, FieldDef, Tag, TagKind, TypeDef, TypeKind, TypeTable};
pub use value::{
    Component, ComponentRef, DynamicComponent, FieldSlot, InstanceId, Value, ValueSnapshot,
};

/// Queries the descriptor builder and handler resolver need from the host.
///
/// Every ordered result must be deterministic for a given model: metadata
/// merging and handler ranking both depend on it.
pub trait CapabilityModel: Send + Sync {
    fn is_configurable(&self, name: &TypeName) -> bool;

    /// Declarations of `name` and of every configurable ancestor/interface,
    /// following [`CapabilityModel::configurable_hierarchy_of`], each type's
    /// own declaration order preserved.
    fn declarations_of(&self, name: &TypeName) -> Vec<&AttributeDeclaration>;

    /// Configurable types of the hierarchy, most-derived first.
    fn configurable_hierarchy_of(&self, name: &TypeName) -> Vec<TypeName>;

    /// Ancestor classes, nearest first, ending at the universal type for
    /// classes. Empty for interfaces.
    fn superclasses_of(&self, name: &TypeName) -> Vec<TypeName>;

    /// Every implemented interface, deduplicated, in walk order.
    fn interfaces_of(&self, name: &TypeName) -> Vec<TypeName>;

    fn is_constraint_tag(&self, tag: &TagName) -> bool;
}

/// True when `candidate` is `name` itself, one of its ancestors, one of its
/// interfaces, or the universal type.
pub fn is_compatible<M: CapabilityModel + ?Sized>(
    model: &M,
    name: &TypeName,
    candidate: &TypeName,
) -> bool {
    name == candidate
        || candidate.is_universal()
        || model.superclasses_of(name).contains(candidate)
        || model.interfaces_of(name).contains(candidate)
}
