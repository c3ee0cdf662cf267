use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// LinkFinder-style pattern: quoted absolute URLs, relative paths, `a/b.ext`
/// paths and bare script/page names.
pub const DEFAULT_API_REGEX: &str = r#"(?:"|')(((?:[a-zA-Z]{1,10}://|//)[^"'/]{1,}\.([a-zA-Z]{2,})[^"']{0,})|((?:/|\.\./|\./)[^"'><,;| *()(%%$^/\\\[\]][^"'><,;|()]{1,})|([a-zA-Z0-9_\-/]{1,}/[a-zA-Z0-9_\-/]{1,}\.(?:[a-zA-Z]{1,4}|action)(?:[\?|/][^"|']{0,}|))|([a-zA-Z0-9_\-]{1,}\.(?:php|asp|aspx|jsp|json|action|html|js|txt|xml)(?:\?[^"|']{0,}|)))(?:"|')"#;

/// Built-in sensitive-data rules as (kind, regex).
pub const DEFAULT_SENSITIVE_PATTERNS: &[(&str, &str)] = &[
    ("wechat session_key leak", r"(?i)\bsession_key\b"),
    ("appsecret leak", r"(?i)\b\w*secret\b"),
    ("mobile number", r"1[3-9]\d{9}"),
    ("id card number", r"\b\d{17}([0-9]|X|x)\b"),
    ("email address", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,4}"),
    (
        "ipv4 address",
        r"(?m)^(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])$",
    ),
    (
        "licence plate",
        r"(?m)^[京津沪渝冀豫云辽黑湘皖鲁新苏浙赣鄂桂甘晋蒙陕吉闽贵粤青藏川宁琼使领A-Z][A-Z][A-Z0-9]{4}[A-Z0-9挂学警港澳]$",
    ),
];

/// Suffixes of parameterless URLs that are static assets rather than APIs.
pub const DEFAULT_SUFFIX_BLACKLIST: &[&str] = &[
    "js", "jpg", "png", "jpeg", "gif", "svg", "wxml", "wxss", "json", "html",
];

/// Substrings marking front-end page/component paths rather than APIs.
pub const DEFAULT_PREFIX_BLACKLIST: &[&str] =
    &["pages/", "components/", "miniprogram_npm/", "node_modules/"];

pub const DEFAULT_APP_INFO_ENDPOINT: &str = "https://kainy.cn/api/weapp/info/";

/// App info lookup settings (`[app_info]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfoConfig {
    /// When false, packages are processed without contacting the endpoint.
    pub enabled: bool,
    /// POST endpoint taking `{"appid": "..."}`.
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for AppInfoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_APP_INFO_ENDPOINT.to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 10,
        }
    }
}

/// Overrides for encrypted-package parameters (`[decrypt]` in config.toml).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecryptConfig {
    /// 16-byte ASCII IV; built-in default when absent.
    #[serde(default)]
    pub iv: Option<String>,
    /// PBKDF2 salt; built-in default when absent.
    #[serde(default)]
    pub salt: Option<String>,
}

/// Global configuration loaded from `~/.config/wxapkg/config.toml`.
///
/// Plain values come before tables so the TOML output stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WxapkgConfig {
    /// Regex extracting API candidates; captures 1..=5 are tried in order.
    pub api_regex: String,
    /// Parameterless URLs with these suffixes are dropped.
    pub suffix_blacklist: BTreeSet<String>,
    /// URLs containing any of these substrings are dropped.
    pub prefix_blacklist: BTreeSet<String>,
    /// Unpack worker threads per package.
    pub threads: usize,
    /// Root for unpacked output; XDG data dir when absent.
    pub output_dir: Option<PathBuf>,
    /// Sensitive-data rules: kind -> regex.
    pub sensitive_patterns: BTreeMap<String, String>,
    pub app_info: AppInfoConfig,
    pub decrypt: Option<DecryptConfig>,
}

impl Default for WxapkgConfig {
    fn default() -> Self {
        Self {
            api_regex: DEFAULT_API_REGEX.to_string(),
            suffix_blacklist: default_suffix_blacklist(),
            prefix_blacklist: default_prefix_blacklist(),
            threads: 5,
            output_dir: None,
            sensitive_patterns: default_sensitive_patterns(),
            app_info: AppInfoConfig::default(),
            decrypt: None,
        }
    }
}

impl WxapkgConfig {
    /// Replace blank or empty settings with the built-in defaults.
    pub fn normalized(mut self) -> Self {
        if self.api_regex.trim().is_empty() {
            self.api_regex = DEFAULT_API_REGEX.to_string();
        } else {
            self.api_regex = self.api_regex.trim().to_string();
        }
        if self.sensitive_patterns.is_empty() {
            self.sensitive_patterns = default_sensitive_patterns();
        }
        if self.suffix_blacklist.is_empty() {
            self.suffix_blacklist = default_suffix_blacklist();
        }
        if self.prefix_blacklist.is_empty() {
            self.prefix_blacklist = default_prefix_blacklist();
        }
        self.threads = self.threads.max(1);
        self
    }

    /// Output root: configured `output_dir`, else `~/.local/share/wxapkg/output`.
    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("wxapkg")?;
                Ok(xdg_dirs.get_data_home().join("output"))
            }
        }
    }
}

pub fn default_sensitive_patterns() -> BTreeMap<String, String> {
    DEFAULT_SENSITIVE_PATTERNS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn default_suffix_blacklist() -> BTreeSet<String> {
    DEFAULT_SUFFIX_BLACKLIST.iter().map(|s| s.to_string()).collect()
}

pub fn default_prefix_blacklist() -> BTreeSet<String> {
    DEFAULT_PREFIX_BLACKLIST.iter().map(|s| s.to_string()).collect()
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wxapkg")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WxapkgConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] for an explicit path.
///
/// An unparseable file is logged and replaced in memory by the defaults; the
/// file itself is left untouched so the user can fix it.
pub fn load_or_init_at(path: &Path) -> Result<WxapkgConfig> {
    if !path.exists() {
        let default_cfg = WxapkgConfig::default();
        save_to(path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    match toml::from_str::<WxapkgConfig>(&data) {
        Ok(cfg) => Ok(cfg.normalized()),
        Err(e) => {
            tracing::warn!("invalid config {}, using defaults: {}", path.display(), e);
            Ok(WxapkgConfig::default())
        }
    }
}

/// Write `cfg` (normalized) as pretty TOML to the default config path.
pub fn save(cfg: &WxapkgConfig) -> Result<PathBuf> {
    let path = config_path()?;
    save_to(&path, cfg)?;
    Ok(path)
}

pub fn save_to(path: &Path, cfg: &WxapkgConfig) -> Result<()> {
    let normalized = cfg.clone().normalized();
    let toml = toml::to_string_pretty(&normalized).context("serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("write config {}", path.display()))?;
    tracing::info!("config saved to {}", path.display());
    Ok(())
}

/// Parse `kind:regex` lines (split at the first `:`). Blank or malformed
/// lines are ignored; no usable line yields the defaults.
pub fn parse_sensitive_text(text: &str) -> BTreeMap<String, String> {
    let parsed: BTreeMap<String, String> = text
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split_once(':'))
        .map(|(kind, regex)| (kind.trim().to_string(), regex.trim().to_string()))
        .filter(|(kind, regex)| !kind.is_empty() && !regex.is_empty())
        .collect();
    if parsed.is_empty() {
        default_sensitive_patterns()
    } else {
        parsed
    }
}

/// Parse a comma separated suffix list, trimmed and lower-cased.
pub fn parse_suffix_text(text: &str) -> BTreeSet<String> {
    let parsed: BTreeSet<String> = text
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if parsed.is_empty() {
        default_suffix_blacklist()
    } else {
        parsed
    }
}

/// Parse a comma separated prefix list; case is kept.
pub fn parse_prefix_text(text: &str) -> BTreeSet<String> {
    let parsed: BTreeSet<String> = text
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if parsed.is_empty() {
        default_prefix_blacklist()
    } else {
        parsed
    }
}

pub fn sensitive_map_to_text(map: &BTreeMap<String, String>) -> String {
    let defaults;
    let map = if map.is_empty() {
        defaults = default_sensitive_patterns();
        &defaults
    } else {
        map
    };
    map.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn suffix_set_to_text(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        return DEFAULT_SUFFIX_BLACKLIST.join(",");
    }
    set.iter().cloned().collect::<Vec<_>>().join(",")
}
