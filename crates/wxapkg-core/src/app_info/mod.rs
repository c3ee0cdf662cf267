//! Mini-program metadata lookup (name, owner, description) by app id.

mod error;
mod fetch;
mod parse;

pub use error::LookupError;
pub use fetch::CurlLookup;
pub use parse::parse_response;

use serde::Serialize;

/// Nick name reported when the app is unknown to the endpoint.
pub const UNKNOWN_NICK_NAME: &str = "未知小程序";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDetails {
    pub appid: String,
    pub nick_name: String,
    pub user_name: String,
    pub description: String,
    pub principal_name: String,
}

impl AppDetails {
    /// Placeholder details used when the lookup fails or is disabled.
    pub fn unknown(appid: &str) -> Self {
        Self {
            appid: appid.to_string(),
            nick_name: UNKNOWN_NICK_NAME.to_string(),
            user_name: String::new(),
            description: String::new(),
            principal_name: String::new(),
        }
    }
}

/// Source of app details. Implemented over HTTP by [`CurlLookup`].
pub trait AppInfoSource: Send + Sync {
    fn lookup(&self, appid: &str) -> Result<AppDetails, LookupError>;
}

/// Look up `appid`, falling back to [`AppDetails::unknown`] plus a warning.
pub fn lookup_or_default(source: &dyn AppInfoSource, appid: &str) -> (AppDetails, Option<String>) {
    match source.lookup(appid) {
        Ok(details) => (details, None),
        Err(e) => {
            tracing::warn!("app info lookup for {} failed: {}", appid, e);
            let warning = match e {
                LookupError::NotListed | LookupError::Rejected(_) => format!("{appid}: {e}"),
                other => format!("app info lookup failed: {other}"),
            };
            (AppDetails::unknown(appid), Some(warning))
        }
    }
}
