//! HTTP lookup over libcurl.

use std::time::Duration;

use crate::config::AppInfoConfig;

use super::{parse_response, AppDetails, AppInfoSource, LookupError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.116 Safari/537.36";

/// POSTs `{"appid": ...}` to the configured endpoint.
///
/// Blocking; each call uses a fresh curl handle so the type is `Sync`.
#[derive(Debug, Clone)]
pub struct CurlLookup {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl CurlLookup {
    pub fn from_config(cfg: &AppInfoConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

impl AppInfoSource for CurlLookup {
    fn lookup(&self, appid: &str) -> Result<AppDetails, LookupError> {
        let body = serde_json::to_vec(&serde_json::json!({ "appid": appid }))?;
        let mut response: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.endpoint)?;
        easy.post(true)?;
        easy.post_fields_copy(&body)?;
        easy.useragent(USER_AGENT)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/json;charset=utf-8")?;
        list.append("Accept: application/json")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(LookupError::Http(code));
        }
        tracing::debug!("app info for {}: {} bytes", appid, response.len());
        parse_response(appid, &response)
    }
}
