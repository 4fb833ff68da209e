// End-to-end coverage for workspace loading, descriptor building, handler
// resolution, and the `bindable` helper binary.
mod support;

use anyhow::Result;
use bindable::{
    AttributeKey, BindError, DynamicComponent, Grouping, PathOverrides, TypeName, Value,
    ValueSnapshot, Workspace, WorkspacePaths, check_constraints, load_instance,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use support::{
    FixtureWorkspace, bindable_binary, clusterer_instance, crate_root, run_command, write_json,
};

fn load_workspace(root: &Path) -> Result<Workspace> {
    let root = root.to_path_buf();
    let paths = WorkspacePaths::resolve(PathOverrides::default(), || Ok(root))?;
    Workspace::load(&paths)
}

fn bindable(root: &Path) -> Command {
    let mut cmd = Command::new(bindable_binary());
    cmd.current_dir(root)
        .env_remove("BINDABLE_ROOT")
        .env_remove("BINDABLE_TYPES")
        .env_remove("BINDABLE_CATALOG")
        .env_remove("BINDABLE_METADATA")
        .env_remove("BINDABLE_LOG");
    cmd
}

#[test]
fn describes_fixture_instance_with_merged_metadata() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let workspace = load_workspace(fixture.root())?;
    let instance = load_instance(&fixture.write_instance("clusterer.json", &clusterer_instance())?)?;

    let descriptor = workspace.builder().build(instance.as_ref(), true)?;
    assert_eq!(descriptor.type_name(), &TypeName::new("Clusterer"));
    assert_eq!(descriptor.attribute_count(), 5);

    let keys: Vec<&str> = descriptor.flatten().iter().map(|a| a.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "Clusterer.threshold",
            "Clusterer.matrix",
            "Algorithm.seed",
            "Algorithm.threshold",
            "Matrix.rank"
        ]
    );

    // The ancestor's entry for `threshold` overwrites the descendant's.
    let own = &descriptor.attributes()[0];
    assert_eq!(
        own.metadata.as_ref().and_then(|m| m.description.as_deref()),
        Some("inherited threshold")
    );
    assert_eq!(descriptor.metadata().and_then(|m| m.label.as_deref()), Some("Clusterer"));

    // The redeclared `threshold` keeps its own value on the ancestor slot.
    let inherited = descriptor
        .attribute(&AttributeKey::qualified(&TypeName::new("Algorithm"), "threshold"))
        .expect("inherited declaration");
    assert_eq!(inherited.value, ValueSnapshot::Number(0.25));
    assert_eq!(own.value, ValueSnapshot::Number(1.5));

    let violations = check_constraints(own);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].message.contains("above maximum"));

    let by_type = descriptor.group_by(Grouping::Structure);
    let counts: BTreeMap<&str, usize> = by_type
        .groups
        .iter()
        .map(|(name, attrs)| (name.as_str(), attrs.len()))
        .collect();
    assert_eq!(
        counts,
        BTreeMap::from([("Algorithm", 2), ("Clusterer", 2), ("Matrix", 1)])
    );
    Ok(())
}

#[test]
fn resolves_every_attribute_of_the_tree() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let workspace = load_workspace(fixture.root())?;
    let instance = load_instance(&fixture.write_instance("clusterer.json", &clusterer_instance())?)?;
    let descriptor = workspace.builder().build(instance.as_ref(), false)?;

    let resolved = workspace
        .resolver()
        .resolve_tree(&descriptor)
        .into_iter()
        .map(|(attr, handler)| -> Result<(String, String), BindError> {
            Ok((attr.key.to_string(), handler?.to_string()))
        })
        .collect::<Result<Vec<_>, BindError>>()?;
    let expected = [
        ("Clusterer.threshold", "range-slider"),
        ("Clusterer.matrix", "component-panel"),
        ("Algorithm.seed", "seed-editor"),
        ("Algorithm.threshold", "number-field"),
        ("Matrix.rank", "integer-field"),
    ];
    assert_eq!(
        resolved,
        expected
            .iter()
            .map(|(k, h)| (k.to_string(), h.to_string()))
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn missing_ancestor_metadata_fails_only_when_loading_metadata() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    fixture.remove_metadata("Algorithm")?;
    let workspace = load_workspace(fixture.root())?;
    let instance = load_instance(&fixture.write_instance("clusterer.json", &clusterer_instance())?)?;

    let err = workspace
        .builder()
        .build(instance.as_ref(), true)
        .expect_err("Algorithm metadata is missing");
    match err {
        BindError::MetadataLoad { type_name, .. } => assert_eq!(type_name.as_str(), "Algorithm"),
        other => panic!("unexpected error {other:?}"),
    }

    let descriptor = workspace.builder().build(instance.as_ref(), false)?;
    assert!(descriptor.metadata().is_none());
    assert!(descriptor.flatten().iter().all(|a| a.metadata.is_none()));
    Ok(())
}

#[test]
fn shared_reference_cycle_is_reported() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let workspace = load_workspace(fixture.root())?;

    let clusterer = Arc::new(DynamicComponent::new("Clusterer"));
    let matrix = Arc::new(DynamicComponent::new("Matrix"));
    clusterer.set("matrix", Value::Component(matrix.clone()));
    matrix.set("parent", Value::Component(clusterer.clone()));

    let err = workspace
        .builder()
        .build(clusterer.as_ref(), false)
        .expect_err("cycle");
    assert_eq!(err.kind(), "circular_reference");
    assert_eq!(
        err.to_string(),
        "circular reference: instance of type Clusterer is already being described"
    );
    matrix.set("parent", Value::Null);
    Ok(())
}

#[test]
fn describe_prints_the_tree() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let instance = fixture.write_instance("clusterer.json", &clusterer_instance())?;
    let mut cmd = bindable(fixture.root());
    cmd.arg("describe").arg("--instance").arg(&instance);
    let output = run_command(cmd)?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("Clusterer (Clusterer)\n"));
    assert!(stdout.contains("  Clusterer.threshold = 1.5 [Range]  # inherited threshold\n"));
    assert!(stdout.contains("    ! Range: value 1.5 is above maximum 1\n"));
    assert!(stdout.contains("  Algorithm.threshold = 0.25  # inherited threshold\n"));
    assert!(stdout.contains("  matrix:\n    Matrix (Matrix)\n      Matrix.rank = 3\n"));
    Ok(())
}

#[test]
fn describe_without_metadata_ignores_metadata_documents() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    fs::write(fixture.root().join("metadata/Clusterer.json"), "{broken")?;
    let instance = fixture.write_instance("clusterer.json", &clusterer_instance())?;

    let mut cmd = bindable(fixture.root());
    cmd.arg("describe").arg("--instance").arg(&instance);
    let output = cmd.output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not load attribute metadata for Clusterer"));

    let mut cmd = bindable(fixture.root());
    cmd.arg("describe")
        .arg("--instance")
        .arg(&instance)
        .arg("--no-metadata");
    let stdout = String::from_utf8(run_command(cmd)?.stdout)?;
    assert!(stdout.starts_with("Clusterer\n"));
    Ok(())
}

#[test]
fn resolve_prints_handlers_and_fails_on_gaps() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let instance = fixture.write_instance("clusterer.json", &clusterer_instance())?;

    let mut cmd = bindable(fixture.root());
    cmd.arg("resolve").arg("--instance").arg(&instance);
    let stdout = String::from_utf8(run_command(cmd)?.stdout)?;
    assert!(stdout.contains("Clusterer.threshold -> range-slider\n"));
    assert!(stdout.contains("Algorithm.seed -> seed-editor\n"));
    assert!(stdout.contains("Matrix.rank -> integer-field\n"));

    let sparse = fixture.root().join("sparse-handlers.json");
    write_json(
        &sparse,
        &json!({
            "schema_version": "handler_catalog_v1",
            "typed": [{"handler": "number-field", "value_type": "number"}]
        }),
    )?;
    let mut cmd = bindable(fixture.root());
    cmd.env("BINDABLE_CATALOG", &sparse)
        .arg("resolve")
        .arg("--instance")
        .arg(&instance);
    let output = cmd.output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Algorithm.threshold -> number-field"));
    assert!(stderr.contains("no suitable handler found for attribute Matrix.rank"));
    assert!(stderr.contains("3 attribute(s) have no handler"));
    Ok(())
}

#[test]
fn workspace_root_is_found_from_env_and_subdirectories() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let instance = fixture.write_instance("clusterer.json", &clusterer_instance())?;
    let nested = fixture.root().join("a/b");
    fs::create_dir_all(&nested)?;

    let mut cmd = bindable(&nested);
    cmd.arg("resolve").arg("--instance").arg(&instance);
    run_command(cmd)?;

    let elsewhere = tempfile::TempDir::new()?;
    let mut cmd = bindable(elsewhere.path());
    cmd.env("BINDABLE_ROOT", fixture.root())
        .arg("resolve")
        .arg("--instance")
        .arg(&instance);
    run_command(cmd)?;
    Ok(())
}

#[test]
fn invalid_documents_are_rejected_with_context() -> Result<()> {
    let fixture = FixtureWorkspace::new()?;
    let instance = fixture.write_instance("clusterer.json", &clusterer_instance())?;
    let bad_types = fixture.root().join("bad-types.json");
    write_json(
        &bad_types,
        &json!({"schema_version": "type_table_v1", "types": [{"name": "A", "kind": "struct"}]}),
    )?;

    let mut cmd = bindable(fixture.root());
    cmd.arg("describe")
        .arg("--instance")
        .arg(&instance)
        .arg("--types")
        .arg(&bad_types);
    let output = cmd.output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed schema validation"));

    let mut cmd = bindable(fixture.root());
    cmd.arg("describe").arg("--bogus");
    let output = cmd.output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown argument: --bogus"));
    Ok(())
}

#[test]
fn shipped_demo_workspace_resolves_cleanly() -> Result<()> {
    let root = crate_root();
    let workspace = load_workspace(&root)?;
    let instance = load_instance(&root.join("demos/clusterer.json"))?;
    let descriptor = workspace.builder().build(instance.as_ref(), true)?;
    assert!(descriptor.nested("preprocessing").is_some());
    for (attribute, handler) in workspace.resolver().resolve_tree(&descriptor) {
        assert!(handler.is_ok(), "no handler for {}", attribute.key);
        assert!(check_constraints(attribute).is_empty(), "{} violates a constraint", attribute.key);
    }

    let mut cmd = bindable(&root);
    cmd.arg("resolve")
        .arg("--instance")
        .arg(root.join("demos/clusterer.json"));
    let stdout = String::from_utf8(run_command(cmd)?.stdout)?;
    assert!(stdout.contains("Clusterer.language -> language-picker\n"));
    assert!(stdout.contains("Clusterer.threshold -> range-slider\n"));
    Ok(())
}
