//! Records where the crate was built so an installed `bindable` can still
//! find the demo workspace when run outside any `bindable.json` tree.
//! `BINDABLE_ROOT_HINT` at build time overrides the manifest directory.

use std::env;
use std::path::PathBuf;

const HINT: &str = "BINDABLE_ROOT_HINT";

fn main() {
    println!("cargo:rerun-if-env-changed={HINT}");

    let Some(raw) = env::var_os(HINT).or_else(|| env::var_os("CARGO_MANIFEST_DIR")) else {
        return;
    };
    let root = PathBuf::from(raw);
    let root = root.canonicalize().unwrap_or(root);
    println!("cargo:rustc-env={HINT}={}", root.display());
}
