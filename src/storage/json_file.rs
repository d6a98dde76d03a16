use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::slug::slugify;

use super::{ProfileRecord, ProfileStore};

/// JSON file-based profile store.
///
/// Directory structure:
/// ```text
/// data/
///   profiles/
///     {username-slug}.json
/// ```
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn profiles_dir(&self) -> PathBuf {
        self.base_path.join("profiles")
    }

    fn profile_file(&self, username: &str) -> PathBuf {
        self.profiles_dir().join(format!("{}.json", slugify(username)))
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &Path,
    ) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {path:?}"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content).await.context("Failed to write file")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for JsonFileStore {
    async fn get(&self, username: &str) -> Result<Option<ProfileRecord>> {
        self.read_json(&self.profile_file(username)).await
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<()> {
        self.write_json(&self.profile_file(&record.username), record)
            .await
    }

    async fn list(&self) -> Result<Vec<ProfileRecord>> {
        let dir = self.profiles_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read profiles directory"),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to list profiles")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.read_json::<ProfileRecord>(&path).await? {
                records.push(record);
            }
        }

        Ok(records)
    }
}
