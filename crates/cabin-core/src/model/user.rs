use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// The three portal roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Renter,
    Staff,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Renter, Self::Staff, Self::Admin];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Renter => "Renter",
            Self::Staff => "Staff",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "renter" => Ok(Self::Renter),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError {
                expected: "role",
                got: s.to_string(),
            }),
        }
    }
}

/// A portal account. Fixture users usually omit `isActive`; absence means active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub property_ids: Vec<String>,
    #[serde(default)]
    pub cabin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl User {
    /// Only an explicit `isActive: false` deactivates a user.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }

    /// Created but has not completed signup yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.signup_token.is_some() && matches!(self.is_active, Some(false))
    }
}

/// Admin form input for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub property_id: String,
    pub cabin_id: Option<String>,
}

/// Partial user update. `cabin_id: Some(None)` clears the cabin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
