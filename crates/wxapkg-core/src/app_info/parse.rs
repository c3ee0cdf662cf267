//! Lookup response parsing.
//!
//! The endpoint answers `{"code": 0, "message": "...", "data": {...}}`. Field
//! types are loose (numbers where strings are expected), so values are read
//! from a `serde_json::Value` and coerced to text.

use serde_json::Value;

use super::{AppDetails, LookupError};

const UNKNOWN_ERROR: &str = "未知错误";

fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn code(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

/// Parse a lookup response body for `appid`.
pub fn parse_response(appid: &str, body: &[u8]) -> Result<AppDetails, LookupError> {
    let root: Value = serde_json::from_slice(body)?;
    let data = match root.get("data") {
        None | Some(Value::Null) => return Err(LookupError::NotListed),
        Some(d) => d,
    };
    if code(root.get("code")) != 0 {
        let msg = text(root.get("message")).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        return Err(LookupError::Rejected(msg));
    }

    let mut details = AppDetails::unknown(appid);
    if let Some(v) = text(data.get("nickName")) {
        details.nick_name = v;
    }
    if let Some(v) = text(data.get("userName")) {
        details.user_name = v;
    }
    if let Some(v) = text(data.get("description")) {
        details.description = v;
    }
    if let Some(v) = text(data.get("principalName")) {
        details.principal_name = v;
    }
    Ok(details)
}
