//! `wxapkg config` – show, reset or update the configuration file.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use wxapkg_core::config::{self, WxapkgConfig};
use wxapkg_core::crypto::DecryptParams;
use wxapkg_core::scan::ScanRules;

use crate::cli::ConfigAction;

/// Settings changed by `config set`; `None` leaves a value as is.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub api_regex: Option<String>,
    /// Contents of a `kind:regex` rules file.
    pub sensitive_text: Option<String>,
    pub suffixes: Option<String>,
    pub prefixes: Option<String>,
    pub threads: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub lookup: Option<bool>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.api_regex.is_none()
            && self.sensitive_text.is_none()
            && self.suffixes.is_none()
            && self.prefixes.is_none()
            && self.threads.is_none()
            && self.output_dir.is_none()
            && self.endpoint.is_none()
            && self.lookup.is_none()
    }
}

/// Apply `update` to `cfg` and check that the result still compiles.
pub fn apply_update(mut cfg: WxapkgConfig, update: ConfigUpdate) -> Result<WxapkgConfig> {
    if let Some(re) = update.api_regex {
        cfg.api_regex = re;
    }
    if let Some(text) = update.sensitive_text {
        cfg.sensitive_patterns = config::parse_sensitive_text(&text);
    }
    if let Some(text) = update.suffixes {
        cfg.suffix_blacklist = config::parse_suffix_text(&text);
    }
    if let Some(text) = update.prefixes {
        cfg.prefix_blacklist = config::parse_prefix_text(&text);
    }
    if let Some(n) = update.threads {
        cfg.threads = n;
    }
    if let Some(dir) = update.output_dir {
        cfg.output_dir = Some(dir);
    }
    if let Some(endpoint) = update.endpoint {
        cfg.app_info.endpoint = endpoint;
    }
    if let Some(enabled) = update.lookup {
        cfg.app_info.enabled = enabled;
    }

    let cfg = cfg.normalized();
    ScanRules::compile(&cfg)?;
    DecryptParams::from_config(cfg.decrypt.as_ref())?;
    Ok(cfg)
}

pub fn run_config(cfg: WxapkgConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(&cfg).context("serialize config")?;
            println!("# {}", config::config_path()?.display());
            print!("{text}");
        }
        ConfigAction::Path => println!("{}", config::config_path()?.display()),
        ConfigAction::Reset => {
            let path = config::save(&WxapkgConfig::default())?;
            println!("Restored default configuration at {}", path.display());
        }
        ConfigAction::Set {
            api_regex,
            sensitive_file,
            suffixes,
            prefixes,
            threads,
            output_dir,
            endpoint,
            lookup,
        } => {
            let sensitive_text = match sensitive_file {
                Some(p) => Some(
                    fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?,
                ),
                None => None,
            };
            let update = ConfigUpdate {
                api_regex,
                sensitive_text,
                suffixes,
                prefixes,
                threads,
                output_dir,
                endpoint,
                lookup,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to set; see `wxapkg config set --help`");
            }
            let cfg = apply_update(cfg, update)?;
            let path = config::save(&cfg)?;
            println!("Configuration saved to {}", path.display());
        }
    }
    Ok(())
}
