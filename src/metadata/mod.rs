//! Human-readable metadata for configurable types.
//!
//! Metadata is authored per declaring type and merged along the configurable
//! hierarchy by the descriptor builder. Providers distinguish a missing
//! document (`Ok(None)`) from one that cannot be read or parsed (`Err`).

pub mod store;

use crate::model::TypeName;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use store::{CachedMetadata, DirectoryMetadata};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeLevel {
    Basic,
    Medium,
    Advanced,
}

impl AttributeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeLevel::Basic => "basic",
            AttributeLevel::Medium => "medium",
            AttributeLevel::Advanced => "advanced",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<AttributeLevel>,
}

impl AttributeMetadata {
    pub fn described(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::default()
        }
    }
}

/// Metadata document for one type; after merging, for its whole hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeMetadata>,
}

impl TypeMetadata {
    pub fn with_attribute(mut self, name: &str, metadata: AttributeMetadata) -> Self {
        self.attributes.insert(name.to_string(), metadata);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.get(name)
    }

    /// Overlay `other`'s attribute entries, replacing entries of the same name.
    pub fn overlay(&mut self, other: &TypeMetadata) {
        for (name, metadata) in &other.attributes {
            self.attributes.insert(name.clone(), metadata.clone());
        }
    }
}

/// Source of per-type metadata documents.
pub trait MetadataProvider: Send + Sync {
    fn metadata_for(&self, name: &TypeName) -> Result<Option<TypeMetadata>>;
}

/// In-memory provider for hosts that author metadata in code.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadata {
    documents: BTreeMap<TypeName, TypeMetadata>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, metadata: TypeMetadata) {
        self.documents.insert(TypeName::new(name), metadata);
    }

    pub fn with(mut self, name: &str, metadata: TypeMetadata) -> Self {
        self.insert(name, metadata);
        self
    }
}

impl MetadataProvider for StaticMetadata {
    fn metadata_for(&self, name: &TypeName) -> Result<Option<TypeMetadata>> {
        Ok(self.documents.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_replaces_entries_with_the_same_name() {
        let mut base = TypeMetadata::default()
            .with_attribute("threshold", AttributeMetadata::described("own"))
            .with_attribute("seed", AttributeMetadata::described("seed"));
        let ancestor = TypeMetadata::default()
            .with_attribute("threshold", AttributeMetadata::described("ancestor"))
            .with_attribute("label", AttributeMetadata::described("label"));
        base.overlay(&ancestor);

        assert_eq!(
            base.attribute("threshold").and_then(|m| m.description.as_deref()),
            Some("ancestor")
        );
        assert!(base.attribute("seed").is_some());
        assert!(base.attribute("label").is_some());
    }

    #[test]
    fn metadata_documents_deserialize_levels() {
        let parsed: TypeMetadata = serde_json::from_str(
            r#"{"title": "Clusterer", "attributes": {"threshold": {"level": "advanced", "group": "Tuning"}}}"#,
        )
        .unwrap();
        let threshold = parsed.attribute("threshold").unwrap();
        assert_eq!(threshold.level, Some(AttributeLevel::Advanced));
        assert_eq!(threshold.group.as_deref(), Some("Tuning"));
        assert_eq!(parsed.title.as_deref(), Some("Clusterer"));
    }

    #[test]
    fn static_provider_signals_absence() {
        let provider = StaticMetadata::new().with("A", TypeMetadata::default());
        assert!(provider.metadata_for(&TypeName::new("A")).unwrap().is_some());
        assert!(provider.metadata_for(&TypeName::new("B")).unwrap().is_none());
    }
}
