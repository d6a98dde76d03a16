//! In-memory profile store for testing purposes.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::slug::slugify;

use super::{ProfileRecord, ProfileStore};

pub struct MemoryStore {
    profiles: Mutex<HashMap<String, ProfileRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, username: &str) -> Result<Option<ProfileRecord>> {
        let profiles = self.profiles.lock().await;
        Ok(profiles.get(&slugify(username)).cloned())
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<()> {
        let mut profiles = self.profiles.lock().await;
        profiles.insert(slugify(&record.username), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProfileRecord>> {
        let profiles = self.profiles.lock().await;
        Ok(profiles.values().cloned().collect())
    }
}
