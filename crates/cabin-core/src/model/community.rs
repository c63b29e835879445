use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::default_false;

/// A discussion thread scoped to one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub property_id: String,
    pub created_by_user_id: String,
    pub title: String,
    pub body_markdown: String,
    #[serde(default = "default_false")]
    pub is_pinned: bool,
    #[serde(default = "default_false")]
    pub is_locked: bool,
    #[serde(with = "crate::time::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time::lenient")]
    pub updated_at: DateTime<Utc>,
}

/// A reply, linked to its thread by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub thread_id: String,
    pub created_by_user_id: String,
    pub body_markdown: String,
    #[serde(with = "crate::time::lenient")]
    pub created_at: DateTime<Utc>,
}

/// Shape of `community.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityData {
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInput {
    pub property_id: String,
    pub title: String,
    pub body_markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyInput {
    pub thread_id: String,
    pub body_markdown: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}
