//! Recursive construction of [`Descriptor`] trees.
//!
//! The builder walks an instance's declarations through the capability model,
//! merges metadata along the configurable hierarchy, and descends into every
//! field currently holding a configurable instance. Visited instances are
//! tracked in a [`Traversal`] owned by a single `build` call, so concurrent
//! builds never share state.

use crate::constraint::constraints_of;
use crate::descriptor::{AttributeDescriptor, Descriptor};
use crate::error::{BindError, BindResult};
use crate::metadata::{MetadataProvider, TypeMetadata};
use crate::model::{CapabilityModel, Component, FieldSlot, InstanceId, TypeName, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// Instances already described during one `build` call.
///
/// Entries are never removed: an instance reachable along two paths is
/// reported the second time it is reached, exactly like a cycle.
#[derive(Debug, Default)]
struct Traversal {
    visited: BTreeSet<InstanceId>,
}

impl Traversal {
    fn enter(&mut self, instance: &dyn Component) -> bool {
        self.visited.insert(InstanceId::of(instance))
    }
}

/// Builds descriptor trees against one capability model and metadata source.
#[derive(Clone, Copy)]
pub struct DescriptorBuilder<'a> {
    model: &'a dyn CapabilityModel,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(model: &'a dyn CapabilityModel, metadata: &'a dyn MetadataProvider) -> Self {
        Self { model, metadata }
    }

    /// Describe `instance`.
    ///
    /// With `load_metadata` false the tree carries no type or attribute
    /// metadata at all and the metadata source is never consulted.
    pub fn build(&self, instance: &dyn Component, load_metadata: bool) -> BindResult<Descriptor> {
        let mut traversal = Traversal::default();
        self.build_in(instance, load_metadata, &mut traversal)
    }

    fn build_in(
        &self,
        instance: &dyn Component,
        load_metadata: bool,
        traversal: &mut Traversal,
    ) -> BindResult<Descriptor> {
        let type_name = instance.type_name().clone();
        if !self.model.is_configurable(&type_name) {
            return Err(BindError::NotConfigurable { type_name });
        }
        if !traversal.enter(instance) {
            return Err(BindError::CircularReference { type_name });
        }
        debug!(type_name = %type_name, load_metadata, "describing instance");

        let metadata = if load_metadata {
            Some(self.merged_metadata(&type_name)?)
        } else {
            None
        };

        // Declarations come most-derived first, so only the first of each
        // name owns the unqualified slot.
        let declarations = self.model.declarations_of(&type_name);
        let mut seen = BTreeSet::new();
        let values = declarations
            .iter()
            .map(|decl| {
                let slot = FieldSlot::new(decl, !seen.insert(decl.name.as_str()));
                instance.read(slot).map_err(|err| BindError::Access {
                    key: decl.key.clone(),
                    reason: format!("{err:#}"),
                })
            })
            .collect::<BindResult<Vec<Value>>>()?;

        let attributes = declarations
            .iter()
            .zip(&values)
            .filter(|(decl, _)| decl.attribute)
            .map(|(decl, value)| {
                let attribute_metadata = metadata
                    .as_ref()
                    .and_then(|m| m.attribute(&decl.name))
                    .cloned();
                AttributeDescriptor::new(
                    decl,
                    value.snapshot(),
                    constraints_of(self.model, decl),
                    attribute_metadata,
                )
            })
            .collect();

        let mut nested: Vec<(String, Descriptor)> = Vec::new();
        for (decl, value) in declarations.iter().zip(&values) {
            let Some(component) = value.as_component() else {
                continue;
            };
            if !self.model.is_configurable(component.type_name()) {
                continue;
            }
            let descriptor = self.build_in(component.as_ref(), load_metadata, traversal)?;
            // A redeclared field name replaces the earlier entry in place.
            match nested.iter().position(|(field, _)| *field == decl.name) {
                Some(index) => nested[index].1 = descriptor,
                None => nested.push((decl.name.clone(), descriptor)),
            }
        }

        Ok(Descriptor::new(type_name, metadata, attributes, nested))
    }

    /// Metadata of `type_name` overlaid with that of every other configurable
    /// type in its hierarchy, in hierarchy order.
    ///
    /// Later entries overwrite earlier ones, so an ancestor's description of
    /// an attribute replaces the most-derived type's own description.
    fn merged_metadata(&self, type_name: &TypeName) -> BindResult<TypeMetadata> {
        let mut merged = self.required_metadata(type_name)?;
        for ancestor in self.model.configurable_hierarchy_of(type_name) {
            if &ancestor == type_name {
                continue;
            }
            let more = self.required_metadata(&ancestor)?;
            merged.overlay(&more);
        }
        Ok(merged)
    }

    fn required_metadata(&self, type_name: &TypeName) -> BindResult<TypeMetadata> {
        match self.metadata.metadata_for(type_name) {
            Ok(Some(metadata)) => Ok(metadata),
            Ok(None) => Err(BindError::MetadataLoad {
                type_name: type_name.clone(),
                reason: "no metadata document".to_string(),
            }),
            Err(err) => Err(BindError::MetadataLoad {
                type_name: type_name.clone(),
                reason: format!("{err:#}"),
            }),
        }
    }
}
