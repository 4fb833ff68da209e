//! Descriptor trees built from configurable instances.
//!
//! A [`Descriptor`] captures, for one instance, the merged type metadata, one
//! [`AttributeDescriptor`] per attribute declaration (in declaration order),
//! and a nested descriptor for every field currently holding a configurable
//! instance. Trees are detached snapshots: they own their data and hold no
//! reference back into the instance graph.

pub mod builder;

use crate::metadata::{AttributeMetadata, TypeMetadata};
use crate::model::{AttributeDeclaration, AttributeKey, Tag, TagName, TypeName, ValueSnapshot};
use std::collections::BTreeMap;

pub use builder::DescriptorBuilder;

/// Everything known about one attribute of a described instance.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDescriptor {
    pub key: AttributeKey,
    pub name: String,
    pub declaring_type: TypeName,
    pub value_type: TypeName,
    /// Every tag on the declaration, constraint or not.
    pub tags: Vec<Tag>,
    pub value: ValueSnapshot,
    pub constraints: Vec<Tag>,
    pub metadata: Option<AttributeMetadata>,
}

impl AttributeDescriptor {
    pub(crate) fn new(
        declaration: &AttributeDeclaration,
        value: ValueSnapshot,
        constraints: Vec<Tag>,
        metadata: Option<AttributeMetadata>,
    ) -> Self {
        Self {
            key: declaration.key.clone(),
            name: declaration.name.clone(),
            declaring_type: declaration.declaring_type.clone(),
            value_type: declaration.value_type.clone(),
            tags: declaration.tags.clone(),
            value,
            constraints,
            metadata,
        }
    }

    pub fn has_tag(&self, tag: &TagName) -> bool {
        self.tags.iter().any(|t| &t.name == tag)
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraints.iter().any(|t| t.name.as_str() == name)
    }

    /// Label for presentation: metadata label, then title, then field name.
    pub fn label(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.label.as_deref().or(m.title.as_deref()))
            .unwrap_or(&self.name)
    }
}

/// How [`Descriptor::group_by`] partitions attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// By declaring type.
    Structure,
    /// By the metadata `group`.
    Group,
    /// By the metadata `level`.
    Level,
}

/// Attributes partitioned by a [`Grouping`]; groups are sorted by label.
#[derive(Debug, Default)]
pub struct AttributeGroups<'a> {
    pub groups: BTreeMap<String, Vec<&'a AttributeDescriptor>>,
    pub ungrouped: Vec<&'a AttributeDescriptor>,
}

/// Descriptor of one configurable instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    type_name: TypeName,
    metadata: Option<TypeMetadata>,
    attributes: Vec<AttributeDescriptor>,
    nested: Vec<(String, Descriptor)>,
}

impl Descriptor {
    pub(crate) fn new(
        type_name: TypeName,
        metadata: Option<TypeMetadata>,
        attributes: Vec<AttributeDescriptor>,
        nested: Vec<(String, Descriptor)>,
    ) -> Self {
        Self {
            type_name,
            metadata,
            attributes,
            nested,
        }
    }

    /// Runtime type of the described instance.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Merged type metadata; `None` when the tree was built without metadata.
    pub fn metadata(&self) -> Option<&TypeMetadata> {
        self.metadata.as_ref()
    }

    /// Direct attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn attribute(&self, key: &AttributeKey) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attr| &attr.key == key)
    }

    /// Nested descriptor for the field `name`, if it held a configurable value.
    pub fn nested(&self, name: &str) -> Option<&Descriptor> {
        self.nested
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, descriptor)| descriptor)
    }

    /// Nested descriptors keyed by field name, in declaration order.
    pub fn nested_descriptors(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.nested
            .iter()
            .map(|(field, descriptor)| (field.as_str(), descriptor))
    }

    /// Every attribute of the tree: own attributes first, then each nested
    /// descriptor's, depth-first.
    pub fn flatten(&self) -> Vec<&AttributeDescriptor> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a AttributeDescriptor>) {
        out.extend(self.attributes.iter());
        for (_, nested) in &self.nested {
            nested.collect_into(out);
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
            + self
                .nested
                .iter()
                .map(|(_, nested)| nested.attribute_count())
                .sum::<usize>()
    }

    /// Copy of the tree keeping only attributes that carry every tag in `tags`.
    ///
    /// Nested descriptors are filtered the same way and kept even when empty,
    /// so the tree shape still mirrors the instance graph.
    pub fn only(&self, tags: &[TagName]) -> Descriptor {
        Descriptor {
            type_name: self.type_name.clone(),
            metadata: self.metadata.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|attr| tags.iter().all(|tag| attr.has_tag(tag)))
                .cloned()
                .collect(),
            nested: self
                .nested
                .iter()
                .map(|(field, nested)| (field.clone(), nested.only(tags)))
                .collect(),
        }
    }

    /// Partition every attribute of the tree.
    pub fn group_by(&self, grouping: Grouping) -> AttributeGroups<'_> {
        let mut groups = AttributeGroups::default();
        for attr in self.flatten() {
            let label = match grouping {
                Grouping::Structure => Some(attr.declaring_type.0.clone()),
                Grouping::Group => attr.metadata.as_ref().and_then(|m| m.group.clone()),
                Grouping::Level => attr
                    .metadata
                    .as_ref()
                    .and_then(|m| m.level)
                    .map(|level| level.as_str().to_string()),
            };
            match label {
                Some(label) => groups.groups.entry(label).or_default().push(attr),
                None => groups.ungrouped.push(attr),
            }
        }
        groups
    }
}
