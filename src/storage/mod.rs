//! Persistence for fetched profiles.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scraper::Account;

/// Flat profile row persisted by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Platform-side account identifier.
    pub ig_id: String,
    pub username: String,
    pub full_name: String,
    pub posts: u64,
    pub followers: u64,
    pub following: u64,
    pub profile_pic: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn from_account(account: &Account) -> Self {
        Self {
            ig_id: account.identifier.clone(),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            posts: account.media_count,
            followers: account.followed_by_count,
            following: account.follows_count,
            profile_pic: account
                .profile_pic_url_hd
                .clone()
                .or_else(|| account.profile_pic_url.clone()),
            fetched_at: Utc::now(),
        }
    }
}

/// Storage trait for persisting profile rows.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, username: &str) -> Result<Option<ProfileRecord>>;

    /// Insert or replace the row for the record's username. Last write wins.
    async fn upsert(&self, record: &ProfileRecord) -> Result<()>;

    async fn list(&self) -> Result<Vec<ProfileRecord>>;
}
