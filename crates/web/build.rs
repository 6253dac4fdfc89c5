//! Build script for the web crate.
//!
//! Fingerprints the bundled stylesheet and script. Each asset is copied to a
//! `derived/` directory under a name carrying its content hash, and the hash
//! is exported to the crate as an environment variable.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// (path under `static/`, file stem, extension, exported variable)
const ASSETS: &[(&str, &str, &str, &str)] = &[
    ("css", "main", "css", "CSS_HASH"),
    ("js", "typeahead", "js", "JS_HASH"),
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    for &(dir, stem, ext, var) in ASSETS {
        fingerprint(&static_dir.join(dir), stem, ext, var);
    }
}

fn fingerprint(dir: &Path, stem: &str, ext: &str, var: &str) {
    let source = dir.join(format!("{stem}.{ext}"));
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short = digest.get(..8).unwrap_or(&digest);
    println!("cargo:rustc-env={var}={short}");

    let derived = dir.join("derived");
    fs::create_dir_all(&derived).expect("Failed to create derived asset directory");
    fs::write(derived.join(format!("{stem}.{short}.{ext}")), &content)
        .expect("Failed to write fingerprinted asset");
}
