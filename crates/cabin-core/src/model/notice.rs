use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, default_false, normalize};

/// A property announcement shown during its time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub property_id: String,
    pub title: String,
    pub body_markdown: String,
    #[serde(with = "crate::time::lenient")]
    pub starts_at: DateTime<Utc>,
    #[serde(with = "crate::time::lenient")]
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_false")]
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutageStatus {
    Planned,
    Active,
    Resolved,
}

impl fmt::Display for OutageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Planned => "Planned",
            Self::Active => "Active",
            Self::Resolved => "Resolved",
        })
    }
}

impl FromStr for OutageStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseEnumError {
                expected: "outage status",
                got: s.to_string(),
            }),
        }
    }
}

/// A utility outage for one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outage {
    pub id: String,
    pub property_id: String,
    pub title: String,
    pub body_markdown: String,
    #[serde(with = "crate::time::lenient")]
    pub starts_at: DateTime<Utc>,
    #[serde(with = "crate::time::lenient")]
    pub ends_at: DateTime<Utc>,
    pub status: OutageStatus,
}

/// Admin input; one notice is created per entry in `property_ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeInput {
    pub title: String,
    pub body_markdown: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub property_ids: Vec<String>,
}

/// Admin input; one outage is created per entry in `property_ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutageInput {
    pub title: String,
    pub body_markdown: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: OutageStatus,
    pub property_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_markdown: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ts"
    )]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ts"
    )]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_markdown: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ts"
    )]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ts"
    )]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OutageStatus>,
}

fn serialize_opt_ts<S: serde::Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => crate::time::lenient::serialize(ts, serializer),
        None => serializer.serialize_none(),
    }
}

/// Records with a display window, sorted newest-start first in listings.
pub trait Scheduled {
    fn starts_at(&self) -> DateTime<Utc>;
    fn ends_at(&self) -> DateTime<Utc>;

    /// Inclusive on both ends.
    fn is_active_at(&self, now: &DateTime<Utc>) -> bool {
        self.starts_at() <= *now && *now <= self.ends_at()
    }
}

impl Scheduled for Notice {
    fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }
}

impl Scheduled for Outage {
    fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }
}

/// Stable sort by `startsAt`, latest first.
pub fn sort_by_start_desc<T: Scheduled>(records: &mut [T]) {
    records.sort_by_key(|r| std::cmp::Reverse(r.starts_at()));
}
