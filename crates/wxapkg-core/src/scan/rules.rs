//! Compiled extraction rules and the URL filter.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

use crate::config::WxapkgConfig;

use super::{ApiFinding, SensitiveFinding};

/// Capture groups tried, in order, for an API candidate.
const API_GROUPS: std::ops::RangeInclusive<usize> = 1..=5;

/// Extension of a URL: text after the last `.` of the part before any `?`/`#`,
/// lower-cased. Empty when there is no dot or the dot is last.
pub fn url_suffix(url: &str) -> String {
    let clean = url.split('?').next().unwrap_or("");
    let clean = clean.split('#').next().unwrap_or("");
    match clean.rfind('.') {
        Some(i) if i + 1 < clean.len() => clean[i + 1..].to_lowercase(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ScanRules {
    api: Regex,
    sensitive: Vec<(String, Regex)>,
    suffix_blacklist: BTreeSet<String>,
    prefix_blacklist: BTreeSet<String>,
}

impl ScanRules {
    /// Compile the rules of a (normalized) config. Errors name the offending rule.
    pub fn compile(cfg: &WxapkgConfig) -> Result<Self> {
        let cfg = cfg.clone().normalized();
        let api = Regex::new(&cfg.api_regex).context("invalid API regex")?;
        let sensitive = cfg
            .sensitive_patterns
            .iter()
            .map(|(kind, pattern)| {
                Regex::new(pattern)
                    .map(|re| (kind.clone(), re))
                    .with_context(|| format!("invalid sensitive regex for {kind:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            api,
            sensitive,
            suffix_blacklist: cfg.suffix_blacklist,
            prefix_blacklist: cfg.prefix_blacklist,
        })
    }

    /// Rules from the built-in defaults.
    pub fn defaults() -> Result<Self> {
        Self::compile(&WxapkgConfig::default())
    }

    /// False for front-end paths (prefix blacklist) and for parameterless
    /// URLs pointing at static assets (suffix blacklist).
    pub fn keep_api(&self, url: &str) -> bool {
        if self.prefix_blacklist.iter().any(|p| url.contains(p.as_str())) {
            return false;
        }
        if !url.contains('?') {
            let suffix = url_suffix(url);
            if !suffix.is_empty() && self.suffix_blacklist.contains(&suffix) {
                return false;
            }
        }
        true
    }

    fn api_candidate<'t>(&self, caps: &regex::Captures<'t>) -> Option<&'t str> {
        if caps.len() == 1 {
            return Some(caps.get(0)?.as_str().trim()).filter(|s| !s.is_empty());
        }
        API_GROUPS
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str().trim())
            .find(|s| !s.is_empty())
    }

    /// Scan one file's text. API indices continue from `next_index`.
    pub fn scan_text(
        &self,
        file: &str,
        text: &str,
        next_index: &mut usize,
        apis: &mut Vec<ApiFinding>,
        sensitive: &mut Vec<SensitiveFinding>,
    ) {
        for caps in self.api.captures_iter(text) {
            let Some(api) = self.api_candidate(&caps) else {
                continue;
            };
            if !self.keep_api(api) {
                continue;
            }
            apis.push(ApiFinding {
                index: *next_index,
                file: file.to_string(),
                api: api.to_string(),
            });
            *next_index += 1;
        }

        for (kind, re) in &self.sensitive {
            for m in re.find_iter(text) {
                sensitive.push(SensitiveFinding {
                    file: file.to_string(),
                    kind: kind.clone(),
                    content: m.as_str().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(rules: &ScanRules, text: &str) -> (Vec<ApiFinding>, Vec<SensitiveFinding>) {
        let (mut apis, mut sens) = (Vec::new(), Vec::new());
        let mut idx = 1;
        rules.scan_text("app-service.js", text, &mut idx, &mut apis, &mut sens);
        (apis, sens)
    }

    fn api_list(rules: &ScanRules, text: &str) -> Vec<String> {
        scan(rules, text).0.into_iter().map(|a| a.api).collect()
    }

    #[test]
    fn url_suffix_cases() {
        assert_eq!(url_suffix("/a/b.PNG"), "png");
        assert_eq!(url_suffix("/a/b.js?v=1"), "js");
        assert_eq!(url_suffix("/a/b.html#top"), "html");
        assert_eq!(url_suffix("/api/user"), "");
        assert_eq!(url_suffix("/api/user."), "");
        assert_eq!(url_suffix("https://x.com/api"), "com/api");
    }

    #[test]
    fn keep_api_filters() {
        let rules = ScanRules::defaults().unwrap();
        assert!(rules.keep_api("/api/user/login"));
        assert!(!rules.keep_api("/static/logo.png"));
        assert!(rules.keep_api("/static/logo.png?x=1"));
        assert!(!rules.keep_api("/pages/index/index"));
        assert!(!rules.keep_api("miniprogram_npm/vant/button.js?x"));
    }

    #[test]
    fn extracts_quoted_apis() {
        let rules = ScanRules::defaults().unwrap();
        let text = r#"
            wx.request({url: "https://api.example.com/v1/order?id=1"});
            const login = '/api/user/login';
            var img = "/images/bg.png";
            navigateTo({url: '/pages/detail/detail'});
            fetch("user/profile.action");
        "#;
        let apis = api_list(&rules, text);
        assert_eq!(
            apis,
            vec![
                "https://api.example.com/v1/order?id=1",
                "/api/user/login",
                "user/profile.action",
            ]
        );
    }

    #[test]
    fn api_indices_continue() {
        let rules = ScanRules::defaults().unwrap();
        let (mut apis, mut sens) = (Vec::new(), Vec::new());
        let mut idx = 7;
        rules.scan_text("a.js", r#"x("/api/a"); y("/api/b")"#, &mut idx, &mut apis, &mut sens);
        assert_eq!(apis.iter().map(|a| a.index).collect::<Vec<_>>(), vec![7, 8]);
        assert_eq!(idx, 9);
        assert_eq!(apis[0].file, "a.js");
    }

    #[test]
    fn finds_sensitive_data() {
        let rules = ScanRules::defaults().unwrap();
        let text = "appSecret: 'x', phone 13812345678, mail dev@example.com, session_key";
        let (_, sens) = scan(&rules, text);
        let kinds: BTreeSet<_> = sens.iter().map(|s| s.kind.as_str()).collect();
        assert!(kinds.contains("appsecret leak"));
        assert!(kinds.contains("mobile number"));
        assert!(kinds.contains("email address"));
        assert!(kinds.contains("wechat session_key leak"));
        let phone = sens.iter().find(|s| s.kind == "mobile number").unwrap();
        assert_eq!(phone.content, "13812345678");
    }

    #[test]
    fn ipv4_matches_whole_lines_only() {
        let rules = ScanRules::defaults().unwrap();
        let (_, sens) = scan(&rules, "host\n10.0.0.1\nversion 1.2.3.4.5");
        let ips: Vec<_> = sens
            .iter()
            .filter(|s| s.kind == "ipv4 address")
            .map(|s| s.content.as_str())
            .collect();
        assert_eq!(ips, vec!["10.0.0.1"]);
    }

    #[test]
    fn custom_rules_without_groups_use_whole_match() {
        let cfg = WxapkgConfig {
            api_regex: r"/v2/[a-z]+".into(),
            sensitive_patterns: [("token".to_string(), r"tk_[0-9a-f]{8}".to_string())]
                .into_iter()
                .collect(),
            ..WxapkgConfig::default()
        };
        let rules = ScanRules::compile(&cfg).unwrap();
        let (apis, sens) = scan(&rules, "call /v2/orders with tk_deadbeef");
        assert_eq!(apis.len(), 1);
        assert_eq!(apis[0].api, "/v2/orders");
        assert_eq!(sens.len(), 1);
        assert_eq!(sens[0].kind, "token");
    }

    #[test]
    fn invalid_rule_is_reported() {
        let cfg = WxapkgConfig {
            sensitive_patterns: [("broken".to_string(), "(".to_string())].into_iter().collect(),
            ..WxapkgConfig::default()
        };
        let err = ScanRules::compile(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }
}
