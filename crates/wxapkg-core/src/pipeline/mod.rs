//! Batch processing: group packages by app, unpack (decrypting when needed),
//! look up app details and scan the unpacked sources.
//!
//! Output for an app lives in `<output_root>/<appid>`; the main package and
//! its subpackages unpack into the same tree, which is cleared once at the
//! start of the app and scanned once at the end.

mod discover;
mod report;

pub use discover::discover;
pub use report::{AppReport, PackageReport, PackageStatus};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_info::{lookup_or_default, AppInfoSource};
use crate::appid::{extract_wxid, validate_wxid, PackageKind, UNKNOWN_APPID};
use crate::checksum::sha256_bytes;
use crate::crypto::{self, DecryptParams};
use crate::package;
use crate::scan::{scan_dir, ScanRules};

pub struct Pipeline<'a> {
    rules: &'a ScanRules,
    output_root: PathBuf,
    threads: usize,
    decrypt: DecryptParams,
    source: Option<&'a dyn AppInfoSource>,
    wxid: Option<String>,
    clean: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(rules: &'a ScanRules, output_root: impl Into<PathBuf>) -> Self {
        Self {
            rules,
            output_root: output_root.into(),
            threads: 5,
            decrypt: DecryptParams::default(),
            source: None,
            wxid: None,
            clean: true,
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn decrypt_params(mut self, params: DecryptParams) -> Self {
        self.decrypt = params;
        self
    }

    /// Enable app detail lookups through `source`.
    pub fn app_info(mut self, source: &'a dyn AppInfoSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Use this app id for every package instead of reading it from the path.
    /// Fails unless the id is well formed.
    pub fn wxid(mut self, wxid: Option<String>) -> anyhow::Result<Self> {
        if let Some(id) = &wxid {
            validate_wxid(id)?;
        }
        self.wxid = wxid;
        Ok(self)
    }

    /// Whether to delete an app's previous output before unpacking (default true).
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    fn app_id_for(&self, path: &Path) -> String {
        self.wxid
            .clone()
            .or_else(|| extract_wxid(path))
            .unwrap_or_else(|| UNKNOWN_APPID.to_string())
    }

    /// Packages grouped by app id; main package first, then by path.
    fn group(&self, paths: &[PathBuf]) -> BTreeMap<String, Vec<PathBuf>> {
        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in paths {
            groups.entry(self.app_id_for(path)).or_default().push(path.clone());
        }
        for packages in groups.values_mut() {
            packages.sort_by(|a, b| (PackageKind::of(a), a).cmp(&(PackageKind::of(b), b)));
            packages.dedup();
        }
        groups
    }

    /// Process all packages and collect one report per app.
    pub fn process(&self, paths: &[PathBuf]) -> Vec<AppReport> {
        let mut reports = Vec::new();
        self.process_with(paths, |r| reports.push(r.clone()));
        reports
    }

    /// Process all packages, handing each app's report to `on_report` as soon as it is done.
    pub fn process_with(&self, paths: &[PathBuf], mut on_report: impl FnMut(&AppReport)) {
        for (app_id, packages) in self.group(paths) {
            let report = self.process_app(&app_id, &packages);
            on_report(&report);
        }
    }

    fn process_app(&self, app_id: &str, packages: &[PathBuf]) -> AppReport {
        let out_dir = self.output_root.join(app_id);
        let mut report = AppReport {
            app_id: app_id.to_string(),
            output_dir: out_dir.clone(),
            details: None,
            packages: Vec::with_capacity(packages.len()),
            scan: None,
            warnings: Vec::new(),
        };
        tracing::info!("processing {} package(s) for {}", packages.len(), app_id);

        if self.clean && out_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&out_dir) {
                tracing::warn!("could not clear {}: {}", out_dir.display(), e);
                report
                    .warnings
                    .push(format!("could not clear previous output {}: {e}", out_dir.display()));
            }
        }

        for path in packages {
            let pkg = self.process_package(app_id, path, &out_dir);
            if let Some(err) = &pkg.error {
                tracing::warn!("{}: {}", path.display(), err);
            }
            if let Some(unpack) = &pkg.unpack {
                for skipped in &unpack.skipped {
                    report.warnings.push(format!(
                        "{}: skipped {}: {}",
                        path.display(),
                        skipped.name,
                        skipped.reason
                    ));
                }
            }
            report.packages.push(pkg);
        }

        if let Some(source) = self.source {
            if app_id != UNKNOWN_APPID {
                let (details, warning) = lookup_or_default(source, app_id);
                report.details = Some(details);
                report.warnings.extend(warning);
            }
        }

        if report.packages.iter().any(|p| p.files_written() > 0) {
            match scan_dir(&out_dir, self.rules) {
                Ok(scan) => report.scan = Some(scan),
                Err(e) => report.warnings.push(format!("scan failed: {e:#}")),
            }
        }
        report
    }

    fn process_package(&self, app_id: &str, path: &Path, out_dir: &Path) -> PackageReport {
        let data = match fs::read(path) {
            Ok(d) => d,
            Err(e) => return PackageReport::failed(path.to_path_buf(), format!("read failed: {e}")),
        };
        let mut pkg = PackageReport {
            path: path.to_path_buf(),
            kind: PackageKind::of(path),
            sha256: Some(sha256_bytes(&data)),
            encrypted: crypto::is_encrypted(&data),
            status: PackageStatus::Failed,
            unpack: None,
            error: None,
        };

        let direct_err = match package::unpack(&data, out_dir, self.threads) {
            Ok(summary) => {
                pkg.status = PackageStatus::Unpacked;
                pkg.unpack = Some(summary);
                return pkg;
            }
            Err(e) => e,
        };

        if !pkg.encrypted {
            pkg.error = Some(format!("unpack failed: {direct_err}"));
            return pkg;
        }
        if app_id == UNKNOWN_APPID {
            pkg.error = Some("encrypted package but no app id in its path; pass one explicitly".into());
            return pkg;
        }

        tracing::debug!("{} is encrypted; decrypting with {}", path.display(), app_id);
        let plain = match crypto::decrypt(app_id, &data, &self.decrypt) {
            Ok(p) => p,
            Err(e) => {
                pkg.error = Some(format!("decrypt failed: {e}"));
                return pkg;
            }
        };
        match package::unpack(&plain, out_dir, self.threads) {
            Ok(summary) => {
                pkg.status = PackageStatus::Decrypted;
                pkg.unpack = Some(summary);
            }
            Err(e) => pkg.error = Some(format!("unpack after decrypt failed: {e}")),
        }
        pkg
    }
}
