//! Read-only fixture store and the query layer built on it.
//!
//! Fixtures are the static JSON documents the portal seeds from. They are
//! fetched fresh on every query and never written. A [`FixtureSource`]
//! resolves a file name to its raw text; [`Fixtures`] decodes and filters.
//!
//! Queries here see fixture data only. Overlay merging happens one layer up
//! in [`crate::portal`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::notice::Scheduled;
use crate::model::{
    Cabin, CommunityData, KbArticle, Notice, Outage, Property, Reply, Thread, Ticket, User,
};

pub const PROPERTIES: &str = "properties.json";
pub const CABINS: &str = "cabins.json";
pub const USERS: &str = "users.json";
pub const TICKETS: &str = "tickets.json";
pub const NOTICES: &str = "notices.json";
pub const OUTAGES: &str = "outages.json";
pub const COMMUNITY: &str = "community.json";
pub const KB: &str = "kb.json";

/// Retries applied to transport failures when none is configured.
pub const DEFAULT_RETRIES: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("fixture {file} is not valid JSON: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FixtureError {
    /// Only transport failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Where fixture files come from.
pub trait FixtureSource: Send + Sync {
    /// Raw text of the fixture named `file` (e.g. `tickets.json`).
    fn fetch(&self, file: &str) -> Result<String, FixtureError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Fixtures in a local directory.
#[derive(Debug, Clone)]
pub struct DirFixtures {
    root: PathBuf,
}

impl DirFixtures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FixtureSource for DirFixtures {
    fn fetch(&self, file: &str) -> Result<String, FixtureError> {
        let path = self.root.join(file);
        fs::read_to_string(&path).map_err(|source| FixtureError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Fixtures served over HTTP at `<base>/<file>`.
#[derive(Debug, Clone)]
pub struct HttpFixtures {
    base_url: String,
    retries: u32,
}

impl HttpFixtures {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retries: DEFAULT_RETRIES,
        }
    }

    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    fn url_for(&self, file: &str) -> String {
        format!("{}/{file}", self.base_url.trim_end_matches('/'))
    }

    fn fetch_once(url: &str) -> Result<String, FixtureError> {
        let response = ureq::get(url)
            .set("Accept", "application/json")
            .set("User-Agent", "cabin-portal")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => FixtureError::Status {
                    url: url.to_string(),
                    status,
                },
                ureq::Error::Transport(transport) => FixtureError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                },
            })?;

        response.into_string().map_err(|err| FixtureError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

impl FixtureSource for HttpFixtures {
    fn fetch(&self, file: &str) -> Result<String, FixtureError> {
        let url = self.url_for(file);
        retry_transport(self.retries, || Self::fetch_once(&url))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Run `fetch`, repeating it up to `retries` more times while it fails with
/// a transport error.
fn retry_transport<F>(retries: u32, mut fetch: F) -> Result<String, FixtureError>
where
    F: FnMut() -> Result<String, FixtureError>,
{
    let mut attempt = 0;
    loop {
        match fetch() {
            Err(err) if err.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(attempt, %err, "retrying fixture fetch");
            }
            other => return other,
        }
    }
}

/// Pick a source for `location`: an `http(s)://` URL or a directory path.
#[must_use]
pub fn source_for(location: &str, retries: u32) -> Box<dyn FixtureSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpFixtures::new(location).with_retries(retries))
    } else {
        Box::new(DirFixtures::new(location))
    }
}

/// Typed, filtered access to the fixture documents.
pub struct Fixtures {
    source: Box<dyn FixtureSource>,
}

impl std::fmt::Debug for Fixtures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixtures")
            .field("source", &self.source.describe())
            .finish()
    }
}

impl Fixtures {
    pub fn new(source: Box<dyn FixtureSource>) -> Self {
        Self { source }
    }

    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(DirFixtures::new(root)))
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<T, FixtureError> {
        let raw = self.source.fetch(file)?;
        let parsed = serde_json::from_str(&raw).map_err(|source| FixtureError::Parse {
            file: file.to_string(),
            source,
        })?;
        debug!(file, source = %self.source.describe(), "loaded fixture");
        Ok(parsed)
    }

    pub fn properties(&self) -> Result<Vec<Property>, FixtureError> {
        self.load(PROPERTIES)
    }

    pub fn property(&self, id: &str) -> Result<Option<Property>, FixtureError> {
        Ok(self.properties()?.into_iter().find(|p| p.id == id))
    }

    pub fn cabins(&self) -> Result<Vec<Cabin>, FixtureError> {
        self.load(CABINS)
    }

    pub fn cabins_by_property(&self, property_id: &str) -> Result<Vec<Cabin>, FixtureError> {
        Ok(self
            .cabins()?
            .into_iter()
            .filter(|c| c.property_id == property_id)
            .collect())
    }

    pub fn cabin(&self, id: &str) -> Result<Option<Cabin>, FixtureError> {
        Ok(self.cabins()?.into_iter().find(|c| c.id == id))
    }

    pub fn users(&self) -> Result<Vec<User>, FixtureError> {
        self.load(USERS)
    }

    pub fn user(&self, id: &str) -> Result<Option<User>, FixtureError> {
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }

    pub fn tickets(&self) -> Result<Vec<Ticket>, FixtureError> {
        self.load(TICKETS)
    }

    /// Tickets created by `user_id`.
    pub fn my_tickets(&self, user_id: &str) -> Result<Vec<Ticket>, FixtureError> {
        Ok(self
            .tickets()?
            .into_iter()
            .filter(|t| t.created_by_user_id == user_id)
            .collect())
    }

    pub fn tickets_by_property(&self, property_id: &str) -> Result<Vec<Ticket>, FixtureError> {
        Ok(self
            .tickets()?
            .into_iter()
            .filter(|t| t.property_id == property_id)
            .collect())
    }

    pub fn assigned_tickets(&self, user_id: &str) -> Result<Vec<Ticket>, FixtureError> {
        Ok(self
            .tickets()?
            .into_iter()
            .filter(|t| t.assigned_to_user_id.as_deref() == Some(user_id))
            .collect())
    }

    /// Tickets in `property_id` with no assignee. An empty assignee string
    /// counts as unassigned.
    pub fn unassigned_tickets(&self, property_id: &str) -> Result<Vec<Ticket>, FixtureError> {
        Ok(self
            .tickets()?
            .into_iter()
            .filter(|t| t.property_id == property_id && is_unassigned(t))
            .collect())
    }

    pub fn ticket(&self, id: &str) -> Result<Option<Ticket>, FixtureError> {
        Ok(self.tickets()?.into_iter().find(|t| t.id == id))
    }

    pub fn notices(&self) -> Result<Vec<Notice>, FixtureError> {
        self.load(NOTICES)
    }

    pub fn notices_by_property(&self, property_id: &str) -> Result<Vec<Notice>, FixtureError> {
        Ok(self
            .notices()?
            .into_iter()
            .filter(|n| n.property_id == property_id)
            .collect())
    }

    pub fn active_notices(
        &self,
        property_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<Vec<Notice>, FixtureError> {
        Ok(self
            .notices_by_property(property_id)?
            .into_iter()
            .filter(|n| n.is_active_at(now))
            .collect())
    }

    pub fn outages(&self) -> Result<Vec<Outage>, FixtureError> {
        self.load(OUTAGES)
    }

    pub fn outages_by_property(&self, property_id: &str) -> Result<Vec<Outage>, FixtureError> {
        Ok(self
            .outages()?
            .into_iter()
            .filter(|o| o.property_id == property_id)
            .collect())
    }

    pub fn active_outages(
        &self,
        property_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<Vec<Outage>, FixtureError> {
        Ok(self
            .outages_by_property(property_id)?
            .into_iter()
            .filter(|o| o.is_active_at(now))
            .collect())
    }

    pub fn community(&self) -> Result<CommunityData, FixtureError> {
        self.load(COMMUNITY)
    }

    pub fn threads(&self, property_id: &str) -> Result<Vec<Thread>, FixtureError> {
        Ok(self
            .community()?
            .threads
            .into_iter()
            .filter(|t| t.property_id == property_id)
            .collect())
    }

    pub fn thread(&self, id: &str) -> Result<Option<Thread>, FixtureError> {
        Ok(self.community()?.threads.into_iter().find(|t| t.id == id))
    }

    pub fn thread_replies(&self, thread_id: &str) -> Result<Vec<Reply>, FixtureError> {
        Ok(self
            .community()?
            .replies
            .into_iter()
            .filter(|r| r.thread_id == thread_id)
            .collect())
    }

    pub fn kb_articles(&self) -> Result<Vec<KbArticle>, FixtureError> {
        self.load(KB)
    }

    pub fn kb_articles_by_property(
        &self,
        property_id: &str,
    ) -> Result<Vec<KbArticle>, FixtureError> {
        Ok(self
            .kb_articles()?
            .into_iter()
            .filter(|a| a.property_id == property_id)
            .collect())
    }

    pub fn kb_article(&self, id: &str) -> Result<Option<KbArticle>, FixtureError> {
        Ok(self.kb_articles()?.into_iter().find(|a| a.id == id))
    }
}

pub(crate) fn is_unassigned(ticket: &Ticket) -> bool {
    ticket.assigned_to_user_id.as_deref().is_none_or(str::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).expect("write fixture");
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            TICKETS,
            r#"[
              {"id":"T-1","propertyId":"P-001","cabinId":"C-014","createdByUserId":"U-1001","assignedToUserId":null,"category":"Plumbing","subcategory":"Leak","priority":"High","status":"Open","description":"drip","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"},
              {"id":"T-2","propertyId":"P-001","cabinId":"C-002","createdByUserId":"U-1002","assignedToUserId":"U-2001","category":"HVAC","subcategory":"Heating","priority":"Low","status":"Assigned","description":"cold","createdAt":"2025-01-02T00:00:00Z","updatedAt":"2025-01-02T00:00:00Z"},
              {"id":"T-3","propertyId":"P-002","cabinId":"C-101","createdByUserId":"U-1001","assignedToUserId":"","category":"Other","subcategory":"Other","priority":"Medium","status":"Open","description":"misc","createdAt":"2025-01-03T00:00:00Z","updatedAt":"2025-01-03T00:00:00Z"}
            ]"#,
        );
        write(
            dir.path(),
            NOTICES,
            r#"[
              {"id":"N-1","propertyId":"P-001","title":"Pool","bodyMarkdown":"closed","startsAt":"2025-01-01T00:00:00Z","endsAt":"2025-01-31T00:00:00Z","isPinned":true},
              {"id":"N-2","propertyId":"P-001","title":"Old","bodyMarkdown":"gone","startsAt":"2024-01-01T00:00:00Z","endsAt":"2024-01-31T00:00:00Z","isPinned":false}
            ]"#,
        );
        dir
    }

    fn site_dir() -> tempfile::TempDir {
        let dir = fixture_dir();
        write(
            dir.path(),
            CABINS,
            r#"[
              {"id":"C-014","propertyId":"P-001","name":"Cabin 14","status":"Active"},
              {"id":"C-101","propertyId":"P-002","name":"Cabin 101","status":"Active"}
            ]"#,
        );
        write(
            dir.path(),
            USERS,
            r#"[
              {"id":"U-1001","email":"jamie@example.test","name":"Jamie Rivers","role":"Renter","propertyIds":["P-001"],"cabinId":"C-014"}
            ]"#,
        );
        write(
            dir.path(),
            OUTAGES,
            r#"[
              {"id":"O-1","propertyId":"P-001","title":"Water","bodyMarkdown":"main","startsAt":"2025-01-15T08:00:00Z","endsAt":"2025-01-15T16:00:00Z","status":"Active"},
              {"id":"O-2","propertyId":"P-002","title":"Power","bodyMarkdown":"grid","startsAt":"2025-01-15T08:00:00Z","endsAt":"2025-01-15T16:00:00Z","status":"Planned"}
            ]"#,
        );
        write(
            dir.path(),
            COMMUNITY,
            r#"{
              "threads": [
                {"id":"TH-1","propertyId":"P-001","createdByUserId":"U-1001","title":"Hiking","bodyMarkdown":"Saturdays","isPinned":false,"createdAt":"2025-01-02T00:00:00Z","updatedAt":"2025-01-02T00:00:00Z"},
                {"id":"TH-2","propertyId":"P-002","createdByUserId":"U-1001","title":"Elsewhere","bodyMarkdown":"x","isPinned":false,"createdAt":"2025-01-03T00:00:00Z","updatedAt":"2025-01-03T00:00:00Z"}
              ],
              "replies": [
                {"id":"RP-1","threadId":"TH-1","createdByUserId":"U-1001","bodyMarkdown":"In","createdAt":"2025-01-04T00:00:00Z"},
                {"id":"RP-2","threadId":"TH-2","createdByUserId":"U-1001","bodyMarkdown":"Out","createdAt":"2025-01-05T00:00:00Z"}
              ]
            }"#,
        );
        write(
            dir.path(),
            KB,
            r#"[
              {"id":"KB-1","propertyId":"P-001","title":"Reset breaker","symptoms":"No power","stepsMarkdown":"1. Open panel","tags":["electrical"],"createdByUserId":"U-2001","upvotes":4,"createdAt":"2024-06-01T00:00:00Z","updatedAt":"2024-06-01T00:00:00Z"}
            ]"#,
        );
        dir
    }

    #[test]
    fn ticket_queries_filter_fixture_rows() {
        let dir = fixture_dir();
        let fixtures = Fixtures::from_dir(dir.path());

        assert_eq!(fixtures.my_tickets("U-1001").expect("mine").len(), 2);
        assert_eq!(fixtures.tickets_by_property("P-002").expect("by property").len(), 1);
        assert_eq!(fixtures.assigned_tickets("U-2001").expect("assigned")[0].id, "T-2");
        assert_eq!(fixtures.unassigned_tickets("P-001").expect("unassigned")[0].id, "T-1");
        assert_eq!(fixtures.unassigned_tickets("P-002").expect("unassigned")[0].id, "T-3");
        assert!(fixtures.ticket("T-404").expect("lookup").is_none());
    }

    #[test]
    fn active_notices_respect_window() {
        let dir = fixture_dir();
        let fixtures = Fixtures::from_dir(dir.path());
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single().expect("date");
        let active = fixtures.active_notices("P-001", &now).expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "N-1");
    }

    #[test]
    fn active_outages_include_both_window_edges() {
        let dir = site_dir();
        let fixtures = Fixtures::from_dir(dir.path());
        let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).single().expect("date");

        for now in [at(8, 0), at(12, 0), at(16, 0)] {
            let active = fixtures.active_outages("P-001", &now).expect("active");
            assert_eq!(active.len(), 1, "at {now}");
            assert_eq!(active[0].id, "O-1");
        }
        assert!(fixtures.active_outages("P-001", &at(7, 59)).expect("early").is_empty());
        assert!(fixtures.active_outages("P-001", &at(16, 1)).expect("late").is_empty());
        assert_eq!(fixtures.outages_by_property("P-002").expect("by property")[0].id, "O-2");
    }

    #[test]
    fn community_queries_filter_by_property_and_thread() {
        let dir = site_dir();
        let fixtures = Fixtures::from_dir(dir.path());

        let threads = fixtures.threads("P-001").expect("threads");
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "TH-1");

        let replies = fixtures.thread_replies("TH-1").expect("replies");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, "RP-1");
        assert!(fixtures.thread_replies("TH-404").expect("none").is_empty());

        let elsewhere = fixtures.thread("TH-2").expect("lookup").expect("TH-2");
        assert_eq!(elsewhere.property_id, "P-002");
        assert!(fixtures.thread("TH-404").expect("lookup").is_none());
    }

    #[test]
    fn lookups_by_id_and_property() {
        let dir = site_dir();
        let fixtures = Fixtures::from_dir(dir.path());

        let cabins = fixtures.cabins_by_property("P-002").expect("cabins");
        assert_eq!(cabins.len(), 1);
        assert_eq!(cabins[0].id, "C-101");

        let jamie = fixtures.user("U-1001").expect("user").expect("U-1001");
        assert_eq!(jamie.name, "Jamie Rivers");
        assert!(fixtures.user("U-404").expect("user").is_none());

        assert_eq!(fixtures.kb_article("KB-1").expect("kb").map(|a| a.upvotes), Some(4));
        assert!(fixtures.kb_article("KB-404").expect("kb").is_none());

        let notices = fixtures.notices_by_property("P-001").expect("notices");
        assert_eq!(notices.len(), 2);
        assert!(fixtures.notices_by_property("P-002").expect("notices").is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fixtures = Fixtures::from_dir(dir.path());
        assert!(matches!(fixtures.kb_articles(), Err(FixtureError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), CABINS, "[{");
        let fixtures = Fixtures::from_dir(dir.path());
        assert!(matches!(fixtures.cabins(), Err(FixtureError::Parse { .. })));
    }

    #[test]
    fn http_source_picks_by_scheme() {
        assert_eq!(
            source_for("https://example.test/data", 1).describe(),
            "https://example.test/data"
        );
        assert_eq!(source_for("fixtures", 1).describe(), "fixtures");
    }

    #[test]
    fn transport_errors_are_retried_once_by_default() {
        let calls = AtomicU32::new(0);
        let result = retry_transport(DEFAULT_RETRIES, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FixtureError::Transport {
                url: "u".into(),
                message: "connection reset".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn status_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_transport(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FixtureError::Status {
                url: "u".into(),
                status: 404,
            })
        });
        assert!(matches!(result, Err(FixtureError::Status { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_stops_on_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transport(1, || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FixtureError::Transport {
                    url: "u".into(),
                    message: "timeout".into(),
                })
            } else {
                Ok("[]".to_string())
            }
        });
        assert_eq!(result.ok().as_deref(), Some("[]"));
    }
}
