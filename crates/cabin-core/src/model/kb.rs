use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staff knowledge-base troubleshooting article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbArticle {
    pub id: String,
    pub property_id: String,
    pub title: String,
    pub symptoms: String,
    pub steps_markdown: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_by_user_id: String,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(with = "crate::time::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time::lenient")]
    pub updated_at: DateTime<Utc>,
}
