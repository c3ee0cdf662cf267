//! `wxapkg unpack` – extract a single package, decrypting it first when needed.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use wxapkg_core::appid::{extract_wxid, validate_wxid};
use wxapkg_core::config::WxapkgConfig;
use wxapkg_core::crypto::{self, DecryptParams};
use wxapkg_core::package;

pub fn run_unpack(
    cfg: &WxapkgConfig,
    path: &Path,
    output: Option<PathBuf>,
    threads: Option<usize>,
    wxid: Option<String>,
) -> Result<()> {
    if let Some(id) = &wxid {
        validate_wxid(id)?;
    }
    let wxid = wxid.or_else(|| extract_wxid(path));
    let out_dir = match output {
        Some(dir) => dir,
        None => {
            let app = wxid.as_deref().unwrap_or(wxapkg_core::appid::UNKNOWN_APPID);
            cfg.resolve_output_dir()?.join(app)
        }
    };
    let threads = threads.unwrap_or(cfg.threads);

    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let (data, decrypted) = if crypto::is_encrypted(&data) {
        let wxid = wxid.as_deref().with_context(|| {
            format!(
                "{} is encrypted and its path has no app id; pass --wxid",
                path.display()
            )
        })?;
        let params = DecryptParams::from_config(cfg.decrypt.as_ref())?;
        (crypto::decrypt(wxid, &data, &params)?, true)
    } else {
        (data, false)
    };

    let summary = package::unpack(&data, &out_dir, threads)
        .with_context(|| format!("unpack {}", path.display()))?;
    tracing::info!(
        "unpacked {} into {} ({} of {} entries)",
        path.display(),
        out_dir.display(),
        summary.written,
        summary.entries
    );

    println!(
        "{} {} file(s) to {}{}",
        if decrypted { "Decrypted and unpacked" } else { "Unpacked" },
        summary.written,
        out_dir.display(),
        if summary.skipped.is_empty() {
            String::new()
        } else {
            format!(" ({} skipped)", summary.skipped.len())
        }
    );
    for s in &summary.skipped {
        println!("  skipped {}: {}", s.name, s.reason);
    }
    Ok(())
}
