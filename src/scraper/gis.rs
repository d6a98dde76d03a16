//! Integrity token (`x-instagram-gis`) derivation.
//!
//! The platform validates that a request's parameters were computed from a
//! page it actually served: the page embeds a nonce (`rhx_gis`) and the
//! client must send the digest of `nonce:serialized_variables` alongside the
//! variables. The token is content-stable, not secret-keyed, and generation
//! never fails; when no nonce is available a placeholder is hashed instead
//! and the platform is free to reject the result.

use md5::{Digest, Md5};
use serde_json::Value;

/// Hashed in place of the nonce when the page did not provide one.
pub const MISSING_NONCE_PLACEHOLDER: &str = "NULL";

/// Request variables to be bound into the token.
#[derive(Debug, Clone)]
pub enum GisVariables {
    /// A structured mapping, serialized compactly with key order preserved.
    Json(Value),
    /// An already-serialized string, used verbatim.
    Raw(String),
}

impl GisVariables {
    fn serialized(&self) -> String {
        match self {
            // Compact by default: no inserted whitespace, insertion order kept.
            GisVariables::Json(value) => {
                serde_json::to_string(value).expect("Failed to serialize gis variables")
            }
            GisVariables::Raw(raw) => raw.clone(),
        }
    }
}

impl From<Value> for GisVariables {
    fn from(value: Value) -> Self {
        GisVariables::Json(value)
    }
}

impl From<String> for GisVariables {
    fn from(raw: String) -> Self {
        GisVariables::Raw(raw)
    }
}

impl From<&str> for GisVariables {
    fn from(raw: &str) -> Self {
        GisVariables::Raw(raw.to_string())
    }
}

/// Hex digest of `nonce + ":" + serialized_variables`.
pub fn gis_token(nonce: Option<&str>, variables: &GisVariables) -> String {
    let input = format!(
        "{}:{}",
        nonce.unwrap_or(MISSING_NONCE_PLACEHOLDER),
        variables.serialized()
    );

    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
