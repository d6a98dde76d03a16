//! Account record extracted from a profile page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar profile fields, flattened out of the nested graphql user object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub identifier: String,
    pub username: String,
    pub full_name: String,
    pub biography: Option<String>,
    pub external_url: Option<String>,
    pub media_count: u64,
    pub followed_by_count: u64,
    pub follows_count: u64,
    pub profile_pic_url: Option<String>,
    pub profile_pic_url_hd: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
}

/// Wire shape of the `graphql.user` object on a profile page.
#[derive(Debug, Deserialize)]
struct GraphqlUser {
    id: String,
    username: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    biography: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    #[serde(default)]
    edge_owner_to_timeline_media: EdgeCount,
    #[serde(default)]
    edge_followed_by: EdgeCount,
    #[serde(default)]
    edge_follow: EdgeCount,
    #[serde(default)]
    profile_pic_url: Option<String>,
    #[serde(default)]
    profile_pic_url_hd: Option<String>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_verified: bool,
}

#[derive(Debug, Default, Deserialize)]
struct EdgeCount {
    #[serde(default)]
    count: u64,
}

impl Account {
    /// Build an account record from the embedded `graphql.user` value.
    pub fn from_graphql_user(user: &Value) -> Result<Self, serde_json::Error> {
        let user: GraphqlUser = serde_json::from_value(user.clone())?;
        Ok(Self {
            identifier: user.id,
            username: user.username,
            full_name: user.full_name,
            biography: user.biography,
            external_url: user.external_url,
            media_count: user.edge_owner_to_timeline_media.count,
            followed_by_count: user.edge_followed_by.count,
            follows_count: user.edge_follow.count,
            profile_pic_url: user.profile_pic_url,
            profile_pic_url_hd: user.profile_pic_url_hd,
            is_private: user.is_private,
            is_verified: user.is_verified,
        })
    }
}
