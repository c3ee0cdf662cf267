//! Information-leak scan over unpacked sources: API endpoints and sensitive data.

mod rules;

pub use rules::{url_suffix, ScanRules};

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiFinding {
    /// 1-based position within one scan.
    pub index: usize,
    /// Path relative to the scanned root, `/`-separated.
    pub file: String,
    pub api: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensitiveFinding {
    pub file: String,
    /// Rule name, e.g. "mobile number".
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub apis: Vec<ApiFinding>,
    pub sensitive: Vec<SensitiveFinding>,
    /// Files or directories that could not be read.
    pub errors: Vec<String>,
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan every regular file under `root` in sorted order. Symlinks are
/// followed; broken links and unreadable files land in `errors`.
pub fn scan_dir(root: &Path, rules: &ScanRules) -> Result<ScanReport> {
    if !root.is_dir() {
        anyhow::bail!("scan root is not a directory: {}", root.display());
    }
    let mut report = ScanReport::default();
    let mut next_index = 1usize;

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("scan walk error: {}", e);
                report.errors.push(e.to_string());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let bytes = match fs::read(path).with_context(|| format!("read {}", path.display())) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("{:#}", e);
                report.errors.push(format!("{e:#}"));
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let name = relative_name(root, path);
        rules.scan_text(
            &name,
            &text,
            &mut next_index,
            &mut report.apis,
            &mut report.sensitive,
        );
        report.files_scanned += 1;
    }

    tracing::debug!(
        "scanned {} files under {}: {} apis, {} sensitive",
        report.files_scanned,
        root.display(),
        report.apis.len(),
        report.sensitive.len()
    );
    Ok(report)
}
