//! File-backed and memoizing metadata providers.

use crate::metadata::{MetadataProvider, TypeMetadata};
use crate::model::TypeName;
use crate::schema_loader::{DocumentKind, validate_document};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Reads `<dir>/<type name>.json` metadata documents.
#[derive(Clone, Debug)]
pub struct DirectoryMetadata {
    dir: PathBuf,
}

impl DirectoryMetadata {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, name: &TypeName) -> Result<PathBuf> {
        let raw = name.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw.starts_with('.') {
            bail!("type name '{raw}' cannot name a metadata document");
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }
}

impl MetadataProvider for DirectoryMetadata {
    fn metadata_for(&self, name: &TypeName) -> Result<Option<TypeMetadata>> {
        let path = self.document_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let data =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        validate_document(DocumentKind::TypeMetadata, &value, &path)?;
        let metadata = serde_json::from_value(value)
            .with_context(|| format!("decoding metadata {}", path.display()))?;
        debug!(path = %path.display(), "loaded type metadata");
        Ok(Some(metadata))
    }
}

/// Memoizes another provider per type for the provider's lifetime.
///
/// Both present and absent documents are remembered; failures are not, so a
/// transient read error is retried by the next caller.
#[derive(Debug)]
pub struct CachedMetadata<P> {
    inner: P,
    cache: RwLock<BTreeMap<TypeName, Option<TypeMetadata>>>,
}

impl<P: MetadataProvider> CachedMetadata<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of types with a remembered lookup.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }
}

impl<P: MetadataProvider> MetadataProvider for CachedMetadata<P> {
    fn metadata_for(&self, name: &TypeName) -> Result<Option<TypeMetadata>> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(name)
        {
            return Ok(hit.clone());
        }
        let loaded = self.inner.metadata_for(name)?;
        self.cache
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .entry(name.clone())
            .or_insert_with(|| loaded.clone());
        Ok(loaded)
    }
}
