//! `wxapkg checksum` – compute (and optionally verify) SHA-256 of a file.

use anyhow::Result;
use std::path::Path;
use wxapkg_core::checksum;

/// Print the digest; with `expect`, fail when it does not match.
pub fn run_checksum(path: &Path, expect: Option<&str>) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());
    if let Some(expected) = expect {
        if !checksum::digest_matches(&digest, expected) {
            anyhow::bail!("checksum mismatch: expected {}", expected.trim());
        }
        println!("OK");
    }
    Ok(())
}
