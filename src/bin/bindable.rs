//! Describes configurable instances and resolves their attribute handlers.
//!
//! `bindable describe` prints the descriptor tree of an instance document;
//! `bindable resolve` prints the handler chosen for every attribute of that
//! tree. Documents come from the workspace manifest (`bindable.json`) unless
//! overridden by flags or `BINDABLE_TYPES` / `BINDABLE_CATALOG` /
//! `BINDABLE_METADATA`.

use anyhow::{Result, anyhow, bail};
use bindable::{
    Descriptor, PathOverrides, Workspace, WorkspacePaths, check_constraints, find_workspace_root,
    load_instance,
};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("BINDABLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;
    let root = cli.root.clone();
    let paths = WorkspacePaths::resolve(cli.overrides.clone().or_env(), || match root {
        Some(root) => Ok(root),
        None => find_workspace_root(),
    })?;
    let workspace = Workspace::load(&paths)?;
    let instance = load_instance(&cli.instance)?;

    match cli.command {
        Command::Describe => {
            let descriptor = workspace.builder().build(instance.as_ref(), cli.load_metadata)?;
            let mut out = String::new();
            render(&descriptor, 0, &mut out);
            print!("{out}");
            Ok(())
        }
        Command::Resolve => {
            let descriptor = workspace.builder().build(instance.as_ref(), false)?;
            let mut failures = Vec::new();
            for (attribute, handler) in workspace.resolver().resolve_tree(&descriptor) {
                match handler {
                    Ok(handler) => println!("{} -> {handler}", attribute.key),
                    Err(err) => {
                        eprintln!("bindable: {err}");
                        failures.push(attribute.key.to_string());
                    }
                }
            }
            if failures.is_empty() {
                Ok(())
            } else {
                bail!(
                    "{} attribute(s) have no handler: {}",
                    failures.len(),
                    failures.join(", ")
                )
            }
        }
    }
}

fn render(descriptor: &Descriptor, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let label = descriptor
        .metadata()
        .and_then(|m| m.label.as_deref().or(m.title.as_deref()));
    match label {
        Some(label) => out.push_str(&format!("{indent}{} ({label})\n", descriptor.type_name())),
        None => out.push_str(&format!("{indent}{}\n", descriptor.type_name())),
    }
    for attribute in descriptor.attributes() {
        out.push_str(&format!(
            "{indent}  {} = {}",
            attribute.key, attribute.value
        ));
        if !attribute.constraints.is_empty() {
            let names: Vec<&str> = attribute.constraints.iter().map(|t| t.name.as_str()).collect();
            out.push_str(&format!(" [{}]", names.join(", ")));
        }
        if let Some(description) = attribute.metadata.as_ref().and_then(|m| m.description.as_deref()) {
            out.push_str(&format!("  # {description}"));
        }
        out.push('\n');
        for violation in check_constraints(attribute) {
            out.push_str(&format!("{indent}    ! {}: {}\n", violation.constraint, violation.message));
        }
    }
    for (field, nested) in descriptor.nested_descriptors() {
        out.push_str(&format!("{indent}  {field}:\n"));
        render(nested, depth + 2, out);
    }
}

enum Command {
    Describe,
    Resolve,
}

struct Cli {
    command: Command,
    instance: PathBuf,
    load_metadata: bool,
    root: Option<PathBuf>,
    overrides: PathOverrides,
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os();
        let _program = args.next();
        let command = match args.next().as_ref().and_then(|arg| arg.to_str()) {
            Some("describe") => Command::Describe,
            Some("resolve") => Command::Resolve,
            Some("--help" | "-h") => usage(0),
            Some(other) => bail!("unknown command: {other}"),
            None => usage(1),
        };

        let mut instance = None;
        let mut load_metadata = true;
        let mut root = None;
        let mut overrides = PathOverrides::default();
        while let Some(arg) = args.next() {
            let arg_str = arg
                .to_str()
                .ok_or_else(|| anyhow!("invalid UTF-8 in argument"))?;
            match arg_str {
                "--instance" => instance = Some(next_path("--instance", &mut args)?),
                "--no-metadata" => load_metadata = false,
                "--root" => root = Some(next_path("--root", &mut args)?),
                "--types" => overrides.types = Some(next_path("--types", &mut args)?),
                "--catalog" => overrides.catalog = Some(next_path("--catalog", &mut args)?),
                "--metadata" => overrides.metadata = Some(next_path("--metadata", &mut args)?),
                "--help" | "-h" => usage(0),
                other => bail!("unknown argument: {other}"),
            }
        }

        let instance = instance.ok_or_else(|| anyhow!("--instance is required"))?;
        if matches!(command, Command::Resolve) && !load_metadata {
            bail!("--no-metadata only applies to describe");
        }
        Ok(Self {
            command,
            instance,
            load_metadata,
            root,
            overrides,
        })
    }
}

fn next_path(flag: &str, args: &mut env::ArgsOs) -> Result<PathBuf> {
    let value = args
        .next()
        .ok_or_else(|| anyhow!("{flag} requires a value"))?;
    let path = PathBuf::from(
        value
            .into_string()
            .map_err(|_| anyhow!("{flag} must be valid UTF-8"))?,
    );
    if path.as_os_str().is_empty() {
        bail!("{flag} must not be empty");
    }
    Ok(path)
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: bindable <describe|resolve> --instance FILE [options]\n\nCommands:\n  describe                  Print the descriptor tree of the instance.\n  resolve                   Print the handler chosen for every attribute.\n\nOptions:\n  --instance FILE           Instance document ({{\"type\": ..., \"fields\": {{...}}}}).\n  --no-metadata             Describe without loading type metadata.\n  --root DIR                Workspace root holding bindable.json (or set BINDABLE_ROOT).\n  --types PATH              Override the type table (or set BINDABLE_TYPES).\n  --catalog PATH            Override the handler catalog (or set BINDABLE_CATALOG).\n  --metadata DIR            Override the metadata directory (or set BINDABLE_METADATA).\n  --help                    Show this help text.\n\nSet BINDABLE_LOG (e.g. debug) to enable diagnostic logging on stderr."
    );
    std::process::exit(code);
}
