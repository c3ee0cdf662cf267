//! App id and package-kind detection from package paths.
//!
//! The PC client stores packages as `.../Applet/<appid>/<version>/__APP__.wxapkg`,
//! so the app id is recovered from the path rather than the package bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// Placeholder id used for output directories when none is found.
pub const UNKNOWN_APPID: &str = "unknown_appid";

/// File name of the main package; everything else is a subpackage.
pub const MAIN_PACKAGE_NAME: &str = "__APP__.wxapkg";

static WXID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bwx[a-f0-9]{16}\b").unwrap_or_else(|e| panic!("invalid wxid pattern: {e}"))
});

static WXID_EXACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^wx[a-f0-9]{16}$").unwrap_or_else(|e| panic!("invalid wxid pattern: {e}"))
});

/// True when `s` is exactly `wx` + 16 lowercase hex digits.
pub fn is_wxid(s: &str) -> bool {
    WXID_EXACT_RE.is_match(s)
}

/// Accept a user-supplied app id. Ids name output directories that get
/// cleared, so anything but a well-formed id is rejected.
pub fn validate_wxid(s: &str) -> anyhow::Result<&str> {
    if !is_wxid(s) {
        anyhow::bail!("invalid app id {s:?}: expected wx followed by 16 lowercase hex digits");
    }
    Ok(s)
}

/// First `wx` + 16 lowercase hex digits found in the path.
pub fn extract_wxid(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    WXID_RE.find(&text).map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Main,
    Sub,
}

impl PackageKind {
    pub fn of(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(MAIN_PACKAGE_NAME) => PackageKind::Main,
            _ => PackageKind::Sub,
        }
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageKind::Main => write!(f, "main package"),
            PackageKind::Sub => write!(f, "subpackage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_wxid_from_client_layout() {
        let p = Path::new("/home/u/Applet/wx1234567890abcdef/12/__APP__.wxapkg");
        assert_eq!(extract_wxid(p).as_deref(), Some("wx1234567890abcdef"));
    }

    #[test]
    fn wxid_requires_word_boundary_and_lowercase_hex() {
        assert_eq!(extract_wxid(Path::new("/x/wx1234567890abcdefff/a.wxapkg")), None);
        assert_eq!(extract_wxid(Path::new("/x/wx1234567890ABCDEF/a.wxapkg")), None);
        assert_eq!(extract_wxid(Path::new("/x/app/a.wxapkg")), None);
    }

    #[test]
    fn validate_wxid_rejects_path_like_ids() {
        assert_eq!(validate_wxid("wx1234567890abcdef").unwrap(), "wx1234567890abcdef");
        for bad in ["", "..", ".", "/home/u", "wx1234567890abcdef/..", "wx1234567890ABCDEF", "wxforced"] {
            assert!(validate_wxid(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn package_kind_by_file_name() {
        assert_eq!(PackageKind::of(Path::new("/a/__APP__.wxapkg")), PackageKind::Main);
        assert_eq!(PackageKind::of(Path::new("/a/_pages_.wxapkg")), PackageKind::Sub);
        assert_eq!(PackageKind::Main.to_string(), "main package");
    }
}
