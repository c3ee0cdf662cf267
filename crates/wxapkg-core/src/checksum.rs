//! SHA-256 fingerprints of packages, recorded in reports so runs over the
//! same package can be matched up.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// SHA-256 of an in-memory buffer as lowercase hex.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 of a file as lowercase hex, streamed.
pub fn sha256_path(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(f), &mut hasher)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compare a hex digest with a user-supplied one, ignoring case and surrounding whitespace.
pub fn digest_matches(digest: &str, expected: &str) -> bool {
    digest.eq_ignore_ascii_case(expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_file_and_buffer() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(sha256_path(f.path()).unwrap(), EMPTY);
        assert_eq!(sha256_bytes(b""), EMPTY);
    }

    #[test]
    fn file_digest_matches_buffer_digest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        f.write_all(&data).unwrap();
        f.flush().unwrap();
        assert_eq!(sha256_path(f.path()).unwrap(), sha256_bytes(&data));
    }

    #[test]
    fn matches_ignores_case_and_whitespace() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        let upper = "5891B5B522D5DF086D0FF0B110FBD9D21BB4FC7163AF34D08286A2E846F6BE03\n";
        assert!(digest_matches(&digest, upper));
        assert!(!digest_matches(&digest, EMPTY));
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sha256_path(&dir.path().join("nope.wxapkg")).is_err());
    }
}
