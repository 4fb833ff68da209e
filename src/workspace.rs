//! Loaded documents of one workspace, ready for building and resolving.

use crate::config::WorkspacePaths;
use crate::descriptor::DescriptorBuilder;
use crate::handler::{HandlerCatalog, HandlerResolver};
use crate::metadata::{CachedMetadata, DirectoryMetadata};
use crate::model::{ComponentRef, DynamicComponent, HandlerId, TypeTable};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub struct Workspace {
    table: TypeTable,
    catalog: HandlerCatalog<HandlerId>,
    metadata: CachedMetadata<DirectoryMetadata>,
}

impl Workspace {
    /// Load the type table and handler catalog named by `paths`.
    ///
    /// Metadata documents are read lazily, once per type.
    pub fn load(paths: &WorkspacePaths) -> Result<Self> {
        let table = TypeTable::load(&paths.type_table)?;
        let catalog = HandlerCatalog::load(&paths.handler_catalog)?;
        Ok(Self {
            table,
            catalog,
            metadata: CachedMetadata::new(DirectoryMetadata::new(&paths.metadata_dir)),
        })
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn catalog(&self) -> &HandlerCatalog<HandlerId> {
        &self.catalog
    }

    pub fn builder(&self) -> DescriptorBuilder<'_> {
        DescriptorBuilder::new(&self.table, &self.metadata)
    }

    pub fn resolver(&self) -> HandlerResolver<'_, HandlerId> {
        HandlerResolver::new(&self.table, &self.catalog)
    }
}

/// Read an instance document (`{"type": ..., "fields": {...}}`).
pub fn load_instance(path: &Path) -> Result<ComponentRef> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    DynamicComponent::from_json(&value)
        .with_context(|| format!("decoding instance {}", path.display()))
}
