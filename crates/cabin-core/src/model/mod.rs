//! Portal records as they appear in the fixture JSON.
//!
//! Field names are camelCase on the wire so fixture files and persisted
//! overlays share one shape.

pub mod community;
pub mod kb;
pub mod notice;
pub mod property;
pub mod ticket;
pub mod user;

use std::fmt;

pub use community::{CommunityData, Reply, ReplyInput, Thread, ThreadInput, ThreadPatch};
pub use kb::KbArticle;
pub use notice::{Notice, NoticeInput, NoticePatch, Outage, OutageInput, OutagePatch, OutageStatus};
pub use property::{Cabin, CabinStatus, Property};
pub use ticket::{Priority, Ticket, TicketInput, TicketPatch, TicketStatus};
pub use user::{CreateUserInput, Role, User, UserPatch};

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

/// Lowercase and drop separators so `In Progress`, `in-progress` and
/// `in_progress` compare equal.
pub(crate) fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub(crate) const fn default_false() -> bool {
    false
}
