//! Embedded JSON Schemas for the on-disk documents the crate reads.
//!
//! Type tables, handler catalogs, and per-type metadata documents are all
//! validated against the schemas under `schema/` before they are deserialized,
//! so loader errors point at the offending JSON rather than at a serde field.
//! Schemas are compiled once per process and shared by every loader.

use anyhow::{Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

pub(crate) const TYPE_TABLE_SCHEMA_VERSION: &str = "type_table_v1";
pub(crate) const HANDLER_CATALOG_SCHEMA_VERSION: &str = "handler_catalog_v1";

/// Documents with a schema under `schema/`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DocumentKind {
    TypeTable,
    HandlerCatalog,
    TypeMetadata,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::TypeTable => "type table",
            DocumentKind::HandlerCatalog => "handler catalog",
            DocumentKind::TypeMetadata => "type metadata",
        }
    }

    fn source(self) -> &'static str {
        match self {
            DocumentKind::TypeTable => include_str!("../schema/type_table.schema.json"),
            DocumentKind::HandlerCatalog => include_str!("../schema/handler_catalog.schema.json"),
            DocumentKind::TypeMetadata => include_str!("../schema/type_metadata.schema.json"),
        }
    }

    fn slot(self) -> usize {
        match self {
            DocumentKind::TypeTable => 0,
            DocumentKind::HandlerCatalog => 1,
            DocumentKind::TypeMetadata => 2,
        }
    }
}

fn compiled(kind: DocumentKind) -> Result<&'static JSONSchema> {
    static SLOTS: [OnceLock<Result<JSONSchema, String>>; 3] = [const { OnceLock::new() }; 3];
    let compiled = SLOTS[kind.slot()].get_or_init(|| compile(kind));
    compiled
        .as_ref()
        .map_err(|err| anyhow!("compiling {} schema: {err}", kind.label()))
}

fn compile(kind: DocumentKind) -> Result<JSONSchema, String> {
    let raw: Value = serde_json::from_str(kind.source()).map_err(|err| err.to_string())?;
    JSONSchema::compile(&raw).map_err(|err| err.to_string())
}

/// Validate `document` against the schema for `kind`.
///
/// Every schema violation is reported, one per line, so a broken document
/// can be fixed in a single pass.
pub(crate) fn validate_document(kind: DocumentKind, document: &Value, origin: &Path) -> Result<()> {
    let schema = compiled(kind)?;
    if let Err(errors) = schema.validate(document) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "{} {} failed schema validation:\n{}",
            kind.label(),
            origin.display(),
            details
        );
    }
    Ok(())
}

/// Reject documents whose `schema_version` is missing or not `expected`.
pub(crate) fn expect_schema_version(document: &Value, expected: &str, origin: &Path) -> Result<()> {
    let version = document
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if version.is_empty() {
        bail!("{}: schema_version must not be empty", origin.display());
    }
    if version != expected {
        bail!(
            "{}: schema_version '{}' not in allowed set [\"{}\"]",
            origin.display(),
            version,
            expected
        );
    }
    Ok(())
}
