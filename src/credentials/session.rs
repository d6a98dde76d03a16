//! Session cache for storing transient authentication state.
//!
//! One JSON blob per account identifier, holding the cookie map captured at
//! login (plus the machine id under the `mid` key). Blobs are overwritten
//! wholesale, never merged, and the write is atomic from the caller's
//! perspective. Single-process, single-writer access is assumed; concurrent
//! writers get last-write-wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::slug::slugify;

/// Cookie name carrying the session identifier of a logged-in session.
pub const SESSION_ID_COOKIE: &str = "sessionid";

/// Cookie name carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Key under which the machine id is stored alongside the cookies.
pub const MID_KEY: &str = "mid";

/// A captured session: cookie name -> value.
///
/// Serialized as a bare JSON object so the on-disk blob is exactly the
/// cookie map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData {
    cookies: HashMap<String, String>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cookies(cookies: HashMap<String, String>) -> Self {
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Add a cookie, builder style.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get(SESSION_ID_COOKIE)
    }

    /// CSRF header value, preferring an `x-csrftoken` cookie over the
    /// standard `csrftoken` one when both are present.
    pub fn csrf_token(&self) -> Option<&str> {
        self.get("x-csrftoken").or_else(|| self.get(CSRF_COOKIE))
    }

    /// Format all cookies as a single `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Cache for session blobs, stored locally (not synced).
pub struct SessionCache {
    cache_dir: PathBuf,
}

impl SessionCache {
    /// Create a new session cache.
    ///
    /// Uses `~/.cache/igram/sessions/` by default.
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .context("Could not find cache directory")?
            .join("igram")
            .join("sessions");

        Self::with_path(cache_dir)
    }

    /// Create a session cache at a custom location.
    pub fn with_path(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create session cache dir: {cache_dir:?}"))?;
        Ok(Self { cache_dir })
    }

    fn session_file(&self, account_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", slugify(account_id)))
    }

    /// Load the cached session for an account, if any.
    pub fn load(&self, account_id: &str) -> Result<Option<SessionData>> {
        let path = self.session_file(account_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {path:?}"))?;

        let session: SessionData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {path:?}"))?;

        Ok(Some(session))
    }

    /// Save a session blob for an account, replacing any prior one.
    ///
    /// Writes to a sibling temp file and renames it into place, so readers
    /// never observe a partial blob.
    pub fn save(&self, account_id: &str, session: &SessionData) -> Result<()> {
        let path = self.session_file(account_id);
        let content = serde_json::to_string(session).context("Failed to serialize session")?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write session file: {tmp:?}"))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move session file into place: {path:?}"))?;

        Ok(())
    }

    /// Delete the cached session for an account. Idempotent.
    pub fn clear(&self, account_id: &str) -> Result<()> {
        let path = self.session_file(account_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete session file: {path:?}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, SessionCache) {
        let dir = TempDir::new().expect("temp dir");
        let cache = SessionCache::with_path(dir.path()).expect("cache");
        (dir, cache)
    }

    #[test]
    fn save_then_load_round_trips() -> Result<()> {
        let (_dir, cache) = cache();

        let session = SessionData::new()
            .with_cookie("csrftoken", "abc")
            .with_cookie("sessionid", "xyz");
        cache.save("some_user", &session)?;

        let loaded = cache.load("some_user")?.expect("session present");
        assert_eq!(loaded, session);
        Ok(())
    }

    #[test]
    fn load_without_save_is_none() -> Result<()> {
        let (_dir, cache) = cache();
        assert!(cache.load("nobody")?.is_none());
        Ok(())
    }

    #[test]
    fn clear_then_load_is_none_and_idempotent() -> Result<()> {
        let (_dir, cache) = cache();

        let session = SessionData::new().with_cookie("sessionid", "xyz");
        cache.save("user", &session)?;

        cache.clear("user")?;
        cache.clear("user")?;
        assert!(cache.load("user")?.is_none());
        Ok(())
    }

    #[test]
    fn save_overwrites_wholesale() -> Result<()> {
        let (_dir, cache) = cache();

        let first = SessionData::new()
            .with_cookie("sessionid", "old")
            .with_cookie("mid", "m1");
        cache.save("user", &first)?;

        let second = SessionData::new().with_cookie("sessionid", "new");
        cache.save("user", &second)?;

        let loaded = cache.load("user")?.expect("session present");
        assert_eq!(loaded.session_id(), Some("new"));
        assert!(loaded.get("mid").is_none(), "old keys must not survive");
        Ok(())
    }

    #[test]
    fn blob_on_disk_is_a_bare_cookie_object() -> Result<()> {
        let dir = TempDir::new()?;
        let cache = SessionCache::with_path(dir.path())?;

        let session = SessionData::new().with_cookie("csrftoken", "abc");
        cache.save("User.Name", &session)?;

        let raw = std::fs::read_to_string(dir.path().join("user-name.json"))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["csrftoken"], "abc");
        Ok(())
    }

    #[test]
    fn csrf_prefers_x_csrftoken_key() {
        let session = SessionData::new()
            .with_cookie("csrftoken", "plain")
            .with_cookie("x-csrftoken", "prefixed");
        assert_eq!(session.csrf_token(), Some("prefixed"));

        let only_plain = SessionData::new().with_cookie("csrftoken", "plain");
        assert_eq!(only_plain.csrf_token(), Some("plain"));
    }

    #[test]
    fn cookie_header_contains_all_pairs() {
        let session = SessionData::new()
            .with_cookie("csrftoken", "abc")
            .with_cookie("sessionid", "xyz");
        let header = session.cookie_header();
        assert!(header.contains("csrftoken=abc"));
        assert!(header.contains("sessionid=xyz"));
    }
}
