//! Workspace discovery and document path resolution.
//!
//! A workspace is a directory holding a `bindable.json` manifest that names
//! the type table, handler catalog, and metadata directory, relative to the
//! manifest. Each path can be overridden by a flag, then by an environment
//! variable, before the manifest is consulted.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "bindable.json";
pub const ROOT_ENV: &str = "BINDABLE_ROOT";
pub const TYPES_ENV: &str = "BINDABLE_TYPES";
pub const CATALOG_ENV: &str = "BINDABLE_CATALOG";
pub const METADATA_ENV: &str = "BINDABLE_METADATA";

/// Contents of `bindable.json`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default = "default_type_table")]
    pub type_table: PathBuf,
    #[serde(default = "default_handler_catalog")]
    pub handler_catalog: PathBuf,
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
}

fn default_type_table() -> PathBuf {
    PathBuf::from("types.json")
}

fn default_handler_catalog() -> PathBuf {
    PathBuf::from("handlers.json")
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("metadata")
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&data)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        for (key, value) in [
            ("type_table", &manifest.type_table),
            ("handler_catalog", &manifest.handler_catalog),
            ("metadata_dir", &manifest.metadata_dir),
        ] {
            if value.as_os_str().is_empty() {
                bail!("{}: {key} must not be empty", path.display());
            }
        }
        Ok(manifest)
    }
}

fn is_workspace_root(candidate: &Path) -> bool {
    candidate.join(MANIFEST_FILE).is_file()
}

fn root_from_hint(hint: &Path) -> Option<PathBuf> {
    if hint.as_os_str().is_empty() || !is_workspace_root(hint) {
        return None;
    }
    fs::canonicalize(hint).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let start = fs::canonicalize(start).ok()?;
    start
        .ancestors()
        .find(|dir| is_workspace_root(dir))
        .map(Path::to_path_buf)
}

/// Locate the workspace root.
///
/// Honors `BINDABLE_ROOT` when it points at a directory holding a manifest,
/// then climbs from the current directory, then falls back to the build-time
/// hint.
pub fn find_workspace_root() -> Result<PathBuf> {
    let cwd = env::current_dir().context("reading current directory")?;
    locate_root(
        env::var_os(ROOT_ENV).map(PathBuf::from).as_deref(),
        &cwd,
        option_env!("BINDABLE_ROOT_HINT").map(Path::new),
    )
}

fn locate_root(env_root: Option<&Path>, start: &Path, hint: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = env_root.and_then(root_from_hint) {
        return Ok(root);
    }
    if let Some(root) = search_upwards(start) {
        return Ok(root);
    }
    if let Some(root) = hint.and_then(root_from_hint) {
        return Ok(root);
    }
    bail!(
        "Unable to locate a {MANIFEST_FILE} workspace. Set {ROOT_ENV} or run from inside a workspace."
    )
}

/// Explicit paths that take precedence over the manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub types: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
}

impl PathOverrides {
    /// Fill paths not already set from `BINDABLE_TYPES`, `BINDABLE_CATALOG`,
    /// and `BINDABLE_METADATA`.
    pub fn or_env(self) -> Self {
        self.or_lookup(|key| env::var_os(key).map(PathBuf::from))
    }

    fn or_lookup(self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|path| !path.as_os_str().is_empty());
        Self {
            types: self.types.or_else(|| lookup(TYPES_ENV)),
            catalog: self.catalog.or_else(|| lookup(CATALOG_ENV)),
            metadata: self.metadata.or_else(|| lookup(METADATA_ENV)),
        }
    }
}

/// Resolved locations of the documents a run needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub type_table: PathBuf,
    pub handler_catalog: PathBuf,
    pub metadata_dir: PathBuf,
}

impl WorkspacePaths {
    /// Combine `overrides` with the workspace manifest.
    ///
    /// `root` is only called when some path is still missing, so fully
    /// overridden runs work outside any workspace.
    pub fn resolve(
        overrides: PathOverrides,
        root: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let (types, catalog, metadata) = match overrides {
            PathOverrides {
                types: Some(type_table),
                catalog: Some(handler_catalog),
                metadata: Some(metadata_dir),
            } => {
                return Ok(Self {
                    type_table,
                    handler_catalog,
                    metadata_dir,
                });
            }
            PathOverrides {
                types,
                catalog,
                metadata,
            } => (types, catalog, metadata),
        };

        let root = root()?;
        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = Manifest::load(&manifest_path)?;
        let paths = Self {
            type_table: types.unwrap_or_else(|| root.join(&manifest.type_table)),
            handler_catalog: catalog.unwrap_or_else(|| root.join(&manifest.handler_catalog)),
            metadata_dir: metadata.unwrap_or_else(|| root.join(&manifest.metadata_dir)),
        };
        debug!(manifest = %manifest_path.display(), ?paths, "resolved workspace paths");
        Ok(paths)
    }
}
