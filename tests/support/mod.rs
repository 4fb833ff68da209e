use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn bindable_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bindable"))
}

/// Run `cmd` and return its output, failing with both streams on a non-zero
/// exit.
pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd.output().with_context(|| format!("spawning {cmd:?}"))?;
    if !output.status.success() {
        bail!(
            "{cmd:?} exited with {}\n--- stdout\n{}\n--- stderr\n{}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))
}

/// Temporary workspace with a manifest, type table, catalog, and metadata.
pub struct FixtureWorkspace {
    dir: TempDir,
}

impl FixtureWorkspace {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path();
        write_json(&root.join("bindable.json"), &json!({}))?;
        write_json(&root.join("types.json"), &type_table())?;
        write_json(&root.join("handlers.json"), &handler_catalog())?;
        write_json(
            &root.join("metadata/Clusterer.json"),
            &json!({
                "label": "Clusterer",
                "attributes": {
                    "threshold": {"description": "own threshold", "group": "Tuning", "level": "basic"}
                }
            }),
        )?;
        write_json(
            &root.join("metadata/Algorithm.json"),
            &json!({
                "attributes": {
                    "threshold": {"description": "inherited threshold"},
                    "seed": {"description": "Random seed.", "level": "advanced"}
                }
            }),
        )?;
        write_json(&root.join("metadata/Matrix.json"), &json!({"label": "Matrix"}))?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_instance(&self, name: &str, value: &Value) -> Result<PathBuf> {
        let path = self.root().join(name);
        write_json(&path, value)?;
        Ok(path)
    }

    pub fn remove_metadata(&self, type_name: &str) -> Result<()> {
        fs::remove_file(self.root().join("metadata").join(format!("{type_name}.json")))?;
        Ok(())
    }
}

pub fn type_table() -> Value {
    json!({
        "schema_version": "type_table_v1",
        "tags": {
            "Input": {},
            "Range": {"constraint": true}
        },
        "types": [
            {"name": "Algorithm", "configurable": true, "fields": [
                {"name": "seed", "type": "integer", "attribute": true},
                {"name": "threshold", "type": "number", "attribute": true}
            ]},
            {"name": "Clusterer", "configurable": true, "extends": "Algorithm", "fields": [
                {"name": "threshold", "type": "number", "attribute": true, "tags": [
                    {"name": "Input"},
                    {"name": "Range", "params": {"min": 0, "max": 1}}
                ]},
                {"name": "matrix", "type": "Matrix", "attribute": true},
                {"name": "owner", "type": "Clusterer"}
            ]},
            {"name": "Matrix", "configurable": true, "fields": [
                {"name": "rank", "type": "integer", "attribute": true},
                {"name": "parent", "type": "Clusterer"}
            ]}
        ]
    })
}

pub fn handler_catalog() -> Value {
    json!({
        "schema_version": "handler_catalog_v1",
        "dedicated": [
            {"handler": "seed-editor", "component": "Algorithm", "attribute": "seed"}
        ],
        "typed": [
            {"handler": "number-field", "value_type": "number"},
            {"handler": "range-slider", "value_type": "number", "constraints": ["Range"], "policy": "all"},
            {"handler": "integer-field", "value_type": "integer"},
            {"handler": "component-panel", "value_type": "object"}
        ]
    })
}

pub fn clusterer_instance() -> Value {
    json!({
        "type": "Clusterer",
        "fields": {
            "threshold": 1.5,
            "Algorithm.threshold": 0.25,
            "seed": 7,
            "matrix": {"type": "Matrix", "fields": {"rank": 3}}
        }
    })
}
