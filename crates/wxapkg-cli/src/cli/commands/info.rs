//! `wxapkg info` – look up a mini-program by app id.

use anyhow::Result;
use std::path::Path;
use wxapkg_core::app_info::{AppInfoSource, CurlLookup};
use wxapkg_core::appid::extract_wxid;
use wxapkg_core::config::WxapkgConfig;

pub fn run_info(cfg: &WxapkgConfig, appid: &str) -> Result<()> {
    if extract_wxid(Path::new(appid)).as_deref() != Some(appid) {
        tracing::warn!("{} does not look like an app id", appid);
    }
    let lookup = CurlLookup::from_config(&cfg.app_info);
    let details = lookup.lookup(appid)?;
    println!("{:<12} {}", "appid", details.appid);
    println!("{:<12} {}", "name", details.nick_name);
    println!("{:<12} {}", "username", details.user_name);
    println!("{:<12} {}", "owner", details.principal_name);
    println!("{:<12} {}", "description", details.description);
    Ok(())
}
