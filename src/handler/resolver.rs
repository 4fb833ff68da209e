//! Selection of one handler for one attribute.
//!
//! Dedicated handlers win outright: the first registered entry whose
//! component is compatible with the target and whose attribute resolves to
//! the descriptor's key is returned. Otherwise type handlers compatible with
//! the attribute's value type are filtered by their constraint policy and
//! ranked by `(distance, constraint affinity)`. Equal ranks keep
//! registration order.

use crate::descriptor::{AttributeDescriptor, Descriptor};
use crate::error::{BindError, BindResult};
use crate::handler::catalog::{DedicatedHandler, HandlerCatalog, TypeHandler};
use crate::model::{AttributeKey, CapabilityModel, TagName, TypeName, is_compatible};
use tracing::{debug, trace, warn};

/// Hierarchy distance from `value_type` to a handler bound to `candidate`.
///
/// `0` for the type itself, `1 + index` along the ancestor chain or the
/// interface list, and `usize::MAX` for the universal type. A candidate
/// outside the hierarchy also yields `0`; the resolver only ranks compatible
/// candidates, so that branch is reached only when called directly.
pub fn distance<M: CapabilityModel + ?Sized>(
    model: &M,
    value_type: &TypeName,
    candidate: &TypeName,
) -> usize {
    if value_type == candidate {
        return 0;
    }
    if candidate.is_universal() {
        return usize::MAX;
    }
    if let Some(index) = model.superclasses_of(value_type).iter().position(|t| t == candidate) {
        return index + 1;
    }
    if let Some(index) = model.interfaces_of(value_type).iter().position(|t| t == candidate) {
        return index + 1;
    }
    warn!(
        value_type = %value_type,
        candidate = %candidate,
        "handler type is unrelated to the value type; treating as distance 0"
    );
    0
}

/// Qualified key a dedicated handler's `attribute` names on `component`.
///
/// The first declaration with that field name wins, most-derived first. A
/// name the component does not declare keys as `component.attribute`, which
/// matches no descriptor.
pub fn attribute_key_for<M: CapabilityModel + ?Sized>(
    model: &M,
    component: &TypeName,
    attribute: &str,
) -> AttributeKey {
    model
        .declarations_of(component)
        .into_iter()
        .find(|decl| decl.name == attribute)
        .map(|decl| decl.key.clone())
        .unwrap_or_else(|| AttributeKey::qualified(component, attribute))
}

/// Read-only view pairing a capability model with a populated catalog.
pub struct HandlerResolver<'a, H> {
    model: &'a dyn CapabilityModel,
    catalog: &'a HandlerCatalog<H>,
}

impl<H> Clone for HandlerResolver<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for HandlerResolver<'_, H> {}

impl<'a, H> HandlerResolver<'a, H> {
    pub fn new(model: &'a dyn CapabilityModel, catalog: &'a HandlerCatalog<H>) -> Self {
        Self { model, catalog }
    }

    /// Pick the handler for `attribute` observed on an instance of `component`.
    pub fn resolve(&self, component: &TypeName, attribute: &AttributeDescriptor) -> BindResult<&'a H> {
        if let Some(entry) = self.dedicated_match(component, attribute) {
            debug!(key = %attribute.key, component = %component, "resolved dedicated handler");
            return Ok(&entry.handler);
        }
        if let Some(entry) = self.type_match(attribute) {
            debug!(
                key = %attribute.key,
                value_type = %entry.value_type,
                "resolved type handler"
            );
            return Ok(&entry.handler);
        }
        Err(BindError::HandlerNotFound {
            key: attribute.key.clone(),
        })
    }

    /// Resolve every attribute of `descriptor`, in [`Descriptor::flatten`]
    /// order, each against the type of the node that owns it.
    pub fn resolve_tree<'d>(
        &self,
        descriptor: &'d Descriptor,
    ) -> Vec<(&'d AttributeDescriptor, BindResult<&'a H>)> {
        let mut out = Vec::with_capacity(descriptor.attribute_count());
        self.resolve_into(descriptor, &mut out);
        out
    }

    fn resolve_into<'d>(
        &self,
        descriptor: &'d Descriptor,
        out: &mut Vec<(&'d AttributeDescriptor, BindResult<&'a H>)>,
    ) {
        for attribute in descriptor.attributes() {
            out.push((attribute, self.resolve(descriptor.type_name(), attribute)));
        }
        for (_, nested) in descriptor.nested_descriptors() {
            self.resolve_into(nested, out);
        }
    }

    fn dedicated_match(
        &self,
        component: &TypeName,
        attribute: &AttributeDescriptor,
    ) -> Option<&'a DedicatedHandler<H>> {
        self.catalog.dedicated().iter().find(|entry| {
            is_compatible(self.model, component, &entry.component)
                && attribute_key_for(self.model, component, &entry.attribute) == attribute.key
        })
    }

    fn type_match(&self, attribute: &AttributeDescriptor) -> Option<&'a TypeHandler<H>> {
        let present: Vec<&TagName> = attribute.constraints.iter().map(|tag| &tag.name).collect();
        let attribute_constrained = !present.is_empty();
        self.catalog
            .typed()
            .iter()
            .filter(|entry| is_compatible(self.model, &attribute.value_type, &entry.value_type))
            .filter(|entry| entry.policy.admits(&entry.constraints, &present))
            .map(|entry| {
                debug_assert!(is_compatible(self.model, &attribute.value_type, &entry.value_type));
                let rank = (
                    distance(self.model, &attribute.value_type, &entry.value_type),
                    affinity(entry.is_constrained(), attribute_constrained),
                );
                trace!(
                    key = %attribute.key,
                    value_type = %entry.value_type,
                    distance = rank.0,
                    affinity = rank.1,
                    "ranked type handler"
                );
                (rank, entry)
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, entry)| entry)
    }
}

/// `0` when the handler's constrainedness matches the attribute's.
fn affinity(handler_constrained: bool, attribute_constrained: bool) -> u8 {
    u8::from(handler_constrained != attribute_constrained)
}
