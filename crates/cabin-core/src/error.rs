use std::fmt;
use std::path::PathBuf;

use crate::fixtures::FixtureError;
use crate::model::user::Role;
use crate::session::Route;
use crate::storage::StorageError;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoSession,
    ConfigParseError,
    FixtureUnavailable,
    ItemNotFound,
    PermissionDenied,
    CabinConflict,
    ThreadLocked,
    InvalidEnumValue,
    InvalidInput,
    InvalidPatch,
    StorageWriteFailed,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoSession => "E1001",
            Self::ConfigParseError => "E1002",
            Self::FixtureUnavailable => "E1003",
            Self::ItemNotFound => "E2001",
            Self::PermissionDenied => "E2002",
            Self::CabinConflict => "E2003",
            Self::ThreadLocked => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::InvalidInput => "E2006",
            Self::InvalidPatch => "E2007",
            Self::StorageWriteFailed => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoSession => "No active session",
            Self::ConfigParseError => "Config file parse error",
            Self::FixtureUnavailable => "Fixture data unavailable",
            Self::ItemNotFound => "Record not found",
            Self::PermissionDenied => "Role not allowed on this screen",
            Self::CabinConflict => "Cabin already assigned",
            Self::ThreadLocked => "Thread is locked",
            Self::InvalidEnumValue => "Invalid role/status/priority value",
            Self::InvalidInput => "Invalid input",
            Self::InvalidPatch => "Patch does not fit the record",
            Self::StorageWriteFailed => "Overlay write failed",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NoSession => Some("Run `cabin session demo` or `cabin session switch` first."),
            Self::ConfigParseError => Some("Fix the syntax of the named config file and retry."),
            Self::FixtureUnavailable => {
                Some("Check --fixtures / CABIN_FIXTURES points at the data directory or URL.")
            }
            Self::ItemNotFound => None,
            Self::PermissionDenied => Some("Switch to a role that can open this screen."),
            Self::CabinConflict => {
                Some("Revoke the current holder first, or retry with --revoke-conflict.")
            }
            Self::ThreadLocked => Some("An admin must unlock the thread before replying."),
            Self::InvalidEnumValue => Some("Use one of the documented values."),
            Self::InvalidInput => None,
            Self::InvalidPatch => Some("Run `cabin reset` to discard stale local changes."),
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Retry after the other `cabin` process releases its lock.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the portal's read and mutation paths.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("no session user; sign in before making changes")]
    NoSession,

    #[error("{role} cannot open {}", .route.path())]
    PermissionDenied { role: Role, route: Route },

    #[error("invalid config in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("cabin {cabin_id} is already assigned to {holder_name} ({holder_id})")]
    CabinAssigned {
        cabin_id: String,
        holder_id: String,
        holder_name: String,
    },

    #[error("thread {0} is locked")]
    ThreadLocked(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    InvalidEnum(#[from] crate::model::ParseEnumError),

    #[error("patch for {kind} {id} does not fit the record: {source}")]
    InvalidPatch {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PortalError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoSession => ErrorCode::NoSession,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::CabinAssigned { .. } => ErrorCode::CabinConflict,
            Self::ThreadLocked(_) => ErrorCode::ThreadLocked,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidEnum(_) => ErrorCode::InvalidEnumValue,
            Self::InvalidPatch { .. } => ErrorCode::InvalidPatch,
            Self::Fixture(_) => ErrorCode::FixtureUnavailable,
            Self::Storage(err) => err.code(),
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T, E = PortalError> = std::result::Result<T, E>;
