use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Ticket urgency as chosen by the renter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

/// Ticket progress. Any status may be overwritten with any other; there is
/// no transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }

    /// Resolved and Closed tickets drop off the dashboard.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// A maintenance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub property_id: String,
    pub cabin_id: String,
    pub created_by_user_id: String,
    #[serde(default)]
    pub assigned_to_user_id: Option<String>,
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub description: String,
    #[serde(with = "crate::time::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time::lenient")]
    pub updated_at: DateTime<Utc>,
}

/// Renter form input for a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketInput {
    pub property_id: String,
    pub cabin_id: String,
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    pub description: String,
}

/// Partial ticket update. `assigned_to_user_id: Some(None)` unassigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_user_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Category catalogue offered by the request form.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("Plumbing", &["Leak", "Clog", "Water Pressure", "Other"]),
    ("Electrical", &["Outlet", "Light Fixture", "Breaker", "Other"]),
    ("HVAC", &["Heating", "Cooling", "Thermostat", "Other"]),
    ("Appliances", &["Refrigerator", "Dishwasher", "Washer/Dryer", "Other"]),
    ("Structural", &["Door", "Window", "Roof", "Floor", "Other"]),
    ("Other", &["Other"]),
];

/// Subcategories for `category`, if it is in the catalogue.
#[must_use]
pub fn subcategories(category: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, subs)| *subs)
}
