//! Extraction of server-rendered state from raw page markup.
//!
//! The platform inlines a JSON blob assigned to `window._sharedData`, and the
//! login page inlines a csrf token the same way. Both are located by pattern
//! search over the raw body text; this is deliberate, a DOM parse buys
//! nothing here and the bodies can be large.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::Result;

/// Assignment prefix preceding the shared-data JSON blob.
pub const SHARED_DATA_MARKER: &str = "_sharedData = ";

/// Statement terminator closing the shared-data blob.
pub const SHARED_DATA_TERMINATOR: &str = ";</script>";

fn shared_data_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            "{}(.*?){}",
            regex::escape(SHARED_DATA_MARKER),
            regex::escape(SHARED_DATA_TERMINATOR)
        );
        Regex::new(&pattern).expect("shared data pattern is valid")
    })
}

fn csrf_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""csrf_token":"(.*?)""#).expect("csrf pattern is valid"))
}

/// Locate and parse the embedded shared-data blob.
///
/// Returns `Ok(None)` when the marker is absent (the page simply has no
/// embedded state). A marker with malformed JSON between it and the
/// terminator is a hard error, not `None`; callers must be able to tell the
/// two apart.
pub fn extract_shared_data(body: &str) -> Result<Option<Value>> {
    let Some(captures) = shared_data_re().captures(body) else {
        return Ok(None);
    };

    let raw = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let value = serde_json::from_str(raw)?;
    Ok(Some(value))
}

/// First csrf token embedded in a login or home page body.
pub fn extract_csrf_token(body: &str) -> Option<&str> {
    csrf_token_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
