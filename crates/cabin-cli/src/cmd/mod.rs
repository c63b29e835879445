//! Command handlers. Each module owns its clap arguments and a `run_*` entry.

pub mod home;
pub mod kb;
pub mod notices;
pub mod outages;
pub mod reset;
pub mod session;
pub mod threads;
pub mod tickets;
pub mod users;

use std::sync::Arc;

use cabin_core::Portal;
use cabin_core::config::EffectiveConfig;
use cabin_core::fixtures::{Fixtures, source_for};
use cabin_core::overlay::Removal;
use cabin_core::storage::{FileStore, SharedStore};
use cabin_core::time::{SystemClock, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use tracing::debug;

/// Build the portal the CLI talks to from the effective config.
pub fn open_portal(config: &EffectiveConfig) -> Portal {
    debug!(fixtures = %config.fixtures, state_dir = %config.state_dir.display(), "opening portal");
    let fixtures = Fixtures::new(source_for(&config.fixtures, config.project.fixtures.retries));
    let store: SharedStore = Arc::new(FileStore::new(&config.state_dir));
    Portal::new(fixtures, store, Arc::new(SystemClock))
        .with_base_url(config.project.portal.base_url.clone())
}

/// What a delete did, in a shape every output mode can render.
#[derive(Debug, Serialize)]
pub struct DeleteOutcome<'a> {
    pub id: &'a str,
    pub removal: &'static str,
}

impl<'a> DeleteOutcome<'a> {
    pub const fn new(id: &'a str, removal: Removal) -> Self {
        let removal = match removal {
            Removal::Unstaged => "unstaged",
            Removal::Tombstoned => "tombstoned",
            Removal::AlreadyDeleted => "already-deleted",
        };
        Self { id, removal }
    }

    pub fn write(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "✓ deleted {} ({})", self.id, self.removal)
    }
}

/// clap value parser for RFC 3339 timestamps (`2025-01-10T09:00:00Z`).
pub fn timestamp_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("'{raw}' is not an RFC 3339 timestamp"))
}

/// Short one-line form of a timestamp for listings.
pub fn short_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
