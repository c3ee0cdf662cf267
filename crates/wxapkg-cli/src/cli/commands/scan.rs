//! `wxapkg scan` – unpack packages per app and report APIs and sensitive data.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use wxapkg_core::app_info::CurlLookup;
use wxapkg_core::config::WxapkgConfig;
use wxapkg_core::crypto::DecryptParams;
use wxapkg_core::pipeline::{self, AppReport, PackageStatus, Pipeline};
use wxapkg_core::scan::ScanRules;

#[derive(Debug)]
pub struct ScanArgs {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub wxid: Option<String>,
    pub offline: bool,
    pub clean: bool,
    pub json: Option<PathBuf>,
    pub apis_only: bool,
}

/// What `scan` writes to stdout; exactly one document so it stays parseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutMode {
    /// Per-app text report plus totals.
    Report,
    /// Distinct APIs, one per line.
    ApiList,
    /// The JSON report (`--json -`), which wins over `--apis-only`.
    Json,
}

impl StdoutMode {
    pub fn select(apis_only: bool, json: Option<&Path>) -> Self {
        if json == Some(Path::new("-")) {
            StdoutMode::Json
        } else if apis_only {
            StdoutMode::ApiList
        } else {
            StdoutMode::Report
        }
    }
}

pub fn run_scan(cfg: &WxapkgConfig, args: ScanArgs) -> Result<()> {
    let rules = ScanRules::compile(cfg)?;
    let output = match args.output {
        Some(dir) => dir,
        None => cfg.resolve_output_dir()?,
    };
    let params = DecryptParams::from_config(cfg.decrypt.as_ref())?;

    let packages = pipeline::discover(&args.path)?;
    if packages.is_empty() {
        println!("No .wxapkg files under {}", args.path.display());
        return Ok(());
    }
    tracing::info!(
        "scanning {} package(s) from {} into {}",
        packages.len(),
        args.path.display(),
        output.display()
    );

    let lookup = CurlLookup::from_config(&cfg.app_info);
    let mut pipeline = Pipeline::new(&rules, output)
        .threads(args.threads.unwrap_or(cfg.threads))
        .decrypt_params(params)
        .wxid(args.wxid)?
        .clean(args.clean);
    if cfg.app_info.enabled && !args.offline {
        pipeline = pipeline.app_info(&lookup);
    }

    let mode = StdoutMode::select(args.apis_only, args.json.as_deref());

    let mut reports = Vec::new();
    pipeline.process_with(&packages, |report| {
        if mode == StdoutMode::Report {
            print_app_report(report);
        }
        reports.push(report.clone());
    });

    match mode {
        StdoutMode::Report => print_totals(&reports),
        StdoutMode::ApiList => {
            for api in distinct_apis(&reports) {
                println!("{api}");
            }
        }
        StdoutMode::Json => {}
    }

    if let Some(json) = &args.json {
        write_json(json, &reports)?;
        if mode == StdoutMode::Report {
            println!("Report written to {}", json.display());
        }
    }

    let unpacked = reports
        .iter()
        .flat_map(|r| &r.packages)
        .any(|p| p.status != PackageStatus::Failed);
    if !unpacked {
        anyhow::bail!("none of the {} package(s) could be unpacked", packages.len());
    }
    Ok(())
}

/// API endpoints across all reports, first occurrence order, without duplicates.
pub fn distinct_apis(reports: &[AppReport]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for scan in reports.iter().filter_map(|r| r.scan.as_ref()) {
        for a in &scan.apis {
            if seen.insert(a.api.as_str()) {
                out.push(a.api.clone());
            }
        }
    }
    out
}

fn write_json(path: &Path, reports: &[AppReport]) -> Result<()> {
    if path == Path::new("-") {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, reports)?;
        writeln!(out)?;
        return Ok(());
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, reports)?;
    out.flush()?;
    tracing::info!("wrote report to {}", path.display());
    Ok(())
}

fn print_app_report(r: &AppReport) {
    println!("== {} -> {}", r.app_id, r.output_dir.display());
    if let Some(d) = &r.details {
        let owner = if d.principal_name.is_empty() {
            "-"
        } else {
            d.principal_name.as_str()
        };
        println!("   name: {}  owner: {}", d.nick_name, owner);
        if !d.description.is_empty() {
            println!("   description: {}", d.description);
        }
    }

    println!("   {:<5} {:<10} {:<6} {}", "KIND", "STATUS", "FILES", "PACKAGE");
    for p in &r.packages {
        println!(
            "   {:<5} {:<10} {:<6} {}",
            p.kind.to_string(),
            format!("{:?}", p.status).to_lowercase(),
            p.files_written(),
            p.path.display()
        );
        if let Some(err) = &p.error {
            println!("         error: {err}");
        }
    }

    if let Some(scan) = &r.scan {
        println!("   APIs ({}):", scan.apis.len());
        for a in &scan.apis {
            println!("   {:<5} {:<40} {}", a.index, a.file, a.api);
        }
        println!("   Sensitive ({}):", scan.sensitive.len());
        for s in &scan.sensitive {
            println!("   {:<24} {:<40} {}", s.kind, s.file, s.content);
        }
        for e in &scan.errors {
            println!("   unreadable: {e}");
        }
    }

    for w in &r.warnings {
        println!("   warning: {w}");
    }
    println!();
}

fn print_totals(reports: &[AppReport]) {
    let packages: usize = reports.iter().map(|r| r.packages.len()).sum();
    let failed = reports
        .iter()
        .flat_map(|r| &r.packages)
        .filter(|p| p.status == PackageStatus::Failed)
        .count();
    let apis: usize = reports.iter().map(AppReport::api_count).sum();
    let sensitive: usize = reports.iter().map(AppReport::sensitive_count).sum();
    println!(
        "{} app(s), {} package(s) ({} failed), {} API(s), {} sensitive match(es)",
        reports.len(),
        packages,
        failed,
        apis,
        sensitive
    );
}
