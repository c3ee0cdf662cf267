//! Structured results of a pipeline run.

use serde::Serialize;
use std::path::PathBuf;

use crate::app_info::AppDetails;
use crate::appid::PackageKind;
use crate::package::UnpackSummary;
use crate::scan::ScanReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Plain package, unpacked directly.
    Unpacked,
    /// Encrypted package, decrypted with the app id then unpacked.
    Decrypted,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub path: PathBuf,
    pub kind: PackageKind,
    pub sha256: Option<String>,
    pub encrypted: bool,
    pub status: PackageStatus,
    pub unpack: Option<UnpackSummary>,
    pub error: Option<String>,
}

impl PackageReport {
    pub(super) fn failed(path: PathBuf, error: String) -> Self {
        Self {
            kind: PackageKind::of(&path),
            path,
            sha256: None,
            encrypted: false,
            status: PackageStatus::Failed,
            unpack: None,
            error: Some(error),
        }
    }

    pub fn files_written(&self) -> usize {
        self.unpack.as_ref().map_or(0, |u| u.written)
    }
}

/// Everything found for one mini-program (main package plus subpackages).
#[derive(Debug, Clone, Serialize)]
pub struct AppReport {
    pub app_id: String,
    pub output_dir: PathBuf,
    /// None when the lookup was disabled or the app id is unknown.
    pub details: Option<AppDetails>,
    pub packages: Vec<PackageReport>,
    pub scan: Option<ScanReport>,
    pub warnings: Vec<String>,
}

impl AppReport {
    pub fn api_count(&self) -> usize {
        self.scan.as_ref().map_or(0, |s| s.apis.len())
    }

    pub fn sensitive_count(&self) -> usize {
        self.scan.as_ref().map_or(0, |s| s.sensitive.len())
    }
}
