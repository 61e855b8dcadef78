//! Fingerprints the shop stylesheet.
//!
//! `static/css/main.css` is copied to `static/css/derived/main.<hash>.css`,
//! where `<hash>` is the first 8 hex digits of its SHA-256. The hash is
//! exported as `CSS_HASH` for the `stylesheet` template filter. If the
//! stylesheet cannot be read or stamped, `CSS_HASH` is empty and pages link
//! `static/css/main.css` directly.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const STYLESHEET: &str = "static/css/main.css";
const DERIVED_DIR: &str = "static/css/derived";
const HASH_BYTES: usize = 4;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let source = manifest_dir.join(STYLESHEET);
    println!("cargo:rerun-if-changed={}", source.display());

    let hash = stamp(&source, &manifest_dir.join(DERIVED_DIR)).unwrap_or_else(|e| {
        println!("cargo:warning=linking unfingerprinted {STYLESHEET}: {e}");
        String::new()
    });
    println!("cargo:rustc-env=CSS_HASH={hash}");
}

/// Write the fingerprinted copy of `source` into `derived_dir` and return
/// the fingerprint. An identical existing copy is left untouched.
fn stamp(source: &Path, derived_dir: &Path) -> io::Result<String> {
    let content = fs::read(source)?;
    let hash = Sha256::digest(&content)
        .iter()
        .take(HASH_BYTES)
        .fold(String::new(), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        });

    fs::create_dir_all(derived_dir)?;
    let target = derived_dir.join(format!("main.{hash}.css"));
    if fs::read(&target).ok().as_deref() != Some(content.as_slice()) {
        fs::write(&target, &content)?;
    }

    Ok(hash)
}
