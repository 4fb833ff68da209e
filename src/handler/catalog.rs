//! Registered handlers available to the resolver.
//!
//! The catalog is two append-only lists kept in registration order: handlers
//! dedicated to one `(component, attribute)` pair and handlers serving every
//! attribute of a compatible value type. Registration order is part of the
//! observable contract because the resolver breaks remaining ties by it.

use crate::model::{HandlerId, TagName, TypeName};
use crate::schema_loader::{
    DocumentKind, HANDLER_CATALOG_SCHEMA_VERSION, expect_schema_version, validate_document,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// How a type handler's required constraints are matched against an
/// attribute's constraint tags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every required constraint must be present.
    All,
    /// At least one required constraint must be present.
    #[default]
    Any,
}

impl MatchPolicy {
    /// A handler requiring nothing admits every attribute.
    pub fn admits(self, required: &BTreeSet<TagName>, present: &[&TagName]) -> bool {
        if required.is_empty() {
            return true;
        }
        match self {
            MatchPolicy::All => required.iter().all(|name| present.contains(&name)),
            MatchPolicy::Any => required.iter().any(|name| present.contains(&name)),
        }
    }
}

/// Handler bound to one attribute of one component type.
#[derive(Clone, Debug, PartialEq)]
pub struct DedicatedHandler<H> {
    pub component: TypeName,
    /// Field name; resolved to a qualified key against the target component.
    pub attribute: String,
    pub handler: H,
}

impl<H> DedicatedHandler<H> {
    pub fn new(component: &str, attribute: &str, handler: H) -> Self {
        Self {
            component: TypeName::new(component),
            attribute: attribute.to_string(),
            handler,
        }
    }
}

/// Handler serving any attribute whose value type is compatible with
/// `value_type`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeHandler<H> {
    pub value_type: TypeName,
    pub constraints: BTreeSet<TagName>,
    pub policy: MatchPolicy,
    pub handler: H,
}

impl<H> TypeHandler<H> {
    pub fn new(value_type: &str, handler: H) -> Self {
        Self {
            value_type: TypeName::new(value_type),
            constraints: BTreeSet::new(),
            policy: MatchPolicy::default(),
            handler,
        }
    }

    pub fn requiring(mut self, policy: MatchPolicy, constraints: &[&str]) -> Self {
        self.policy = policy;
        self.constraints = constraints.iter().map(|name| TagName::new(*name)).collect();
        self
    }

    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }
}

/// Dedicated and type handlers in registration order.
#[derive(Clone, Debug)]
pub struct HandlerCatalog<H = HandlerId> {
    dedicated: Vec<DedicatedHandler<H>>,
    typed: Vec<TypeHandler<H>>,
}

impl<H> Default for HandlerCatalog<H> {
    fn default() -> Self {
        Self {
            dedicated: Vec::new(),
            typed: Vec::new(),
        }
    }
}

impl<H> HandlerCatalog<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_dedicated(&mut self, entry: DedicatedHandler<H>) -> &mut Self {
        self.dedicated.push(entry);
        self
    }

    pub fn register_type(&mut self, entry: TypeHandler<H>) -> &mut Self {
        self.typed.push(entry);
        self
    }

    pub fn dedicated(&self) -> &[DedicatedHandler<H>] {
        &self.dedicated
    }

    pub fn typed(&self) -> &[TypeHandler<H>] {
        &self.typed
    }

    pub fn len(&self) -> usize {
        self.dedicated.len() + self.typed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    dedicated: Vec<DedicatedEntry>,
    #[serde(default)]
    typed: Vec<TypedEntry>,
}

#[derive(Deserialize)]
struct DedicatedEntry {
    handler: HandlerId,
    component: TypeName,
    attribute: String,
}

#[derive(Deserialize)]
struct TypedEntry {
    handler: HandlerId,
    value_type: TypeName,
    #[serde(default)]
    constraints: Vec<TagName>,
    #[serde(default)]
    policy: MatchPolicy,
}

impl HandlerCatalog<HandlerId> {
    /// Load a catalog document from disk.
    ///
    /// Entries keep document order. Handler ids must be non-empty and unique
    /// across both lists so a resolved id names exactly one entry.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        validate_document(DocumentKind::HandlerCatalog, &value, path)?;
        expect_schema_version(&value, HANDLER_CATALOG_SCHEMA_VERSION, path)?;
        let document: CatalogDocument = serde_json::from_value(value)
            .with_context(|| format!("decoding handler catalog {}", path.display()))?;

        let mut seen = BTreeSet::new();
        let mut claim = |id: &HandlerId| -> Result<()> {
            if id.0.trim().is_empty() {
                bail!("{}: encountered handler with no id", path.display());
            }
            if !seen.insert(id.clone()) {
                bail!("{}: duplicate handler id {}", path.display(), id);
            }
            Ok(())
        };

        let mut catalog = Self::new();
        for entry in document.dedicated {
            claim(&entry.handler)?;
            catalog.register_dedicated(DedicatedHandler {
                component: entry.component,
                attribute: entry.attribute,
                handler: entry.handler,
            });
        }
        for entry in document.typed {
            claim(&entry.handler)?;
            catalog.register_type(TypeHandler {
                value_type: entry.value_type,
                constraints: entry.constraints.into_iter().collect(),
                policy: entry.policy,
                handler: entry.handler,
            });
        }
        debug!(
            path = %path.display(),
            dedicated = catalog.dedicated.len(),
            typed = catalog.typed.len(),
            "loaded handler catalog"
        );
        Ok(catalog)
    }
}
