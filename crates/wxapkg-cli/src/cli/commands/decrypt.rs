//! `wxapkg decrypt` – turn an encrypted package into a plain one.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use wxapkg_core::appid::extract_wxid;
use wxapkg_core::config::WxapkgConfig;
use wxapkg_core::crypto::{self, DecryptParams};

/// `<dir>/<stem>_dec.wxapkg` next to `path`.
pub fn default_decrypt_output(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    path.with_file_name(format!("{stem}_dec.wxapkg"))
}

pub fn run_decrypt(
    cfg: &WxapkgConfig,
    path: &Path,
    wxid: Option<String>,
    output: Option<PathBuf>,
    iv: Option<String>,
    salt: Option<String>,
) -> Result<()> {
    let wxid = wxid.or_else(|| extract_wxid(path)).with_context(|| {
        format!("no app id in {}; pass --wxid", path.display())
    })?;

    let configured = cfg.decrypt.clone().unwrap_or_default();
    let params = DecryptParams::new(
        iv.as_deref().or(configured.iv.as_deref()),
        salt.as_deref().or(configured.salt.as_deref()),
    )?;

    if !path.is_file() {
        anyhow::bail!("no such file: {}", path.display());
    }
    if !crypto::is_encrypted_path(path)? {
        anyhow::bail!("{} is not encrypted (no V1MMWX marker)", path.display());
    }

    let dst = output.unwrap_or_else(|| default_decrypt_output(path));
    let len = crypto::decrypt_file(&wxid, path, &dst, &params)
        .with_context(|| format!("decrypt {}", path.display()))?;
    println!("Decrypted {} -> {} ({} bytes)", path.display(), dst.display(), len);
    Ok(())
}
