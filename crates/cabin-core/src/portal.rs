//! Screen-level reads and the mutations behind each form.
//!
//! Every method here is one screen (or one action on a screen): it checks the
//! session against the screen's route, reads fixtures, merges the overlays,
//! and filters. Views always merge the full record set before filtering, so
//! an overlay edit that moves a record into or out of a filter is honoured.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{PortalError, Result};
use crate::fixtures::{Fixtures, is_unassigned};
use crate::model::notice::Scheduled;
use crate::model::ticket::subcategories;
use crate::model::{
    Cabin, CreateUserInput, KbArticle, Notice, NoticeInput, NoticePatch, Outage, OutageInput,
    OutagePatch, Priority, Property, Reply, ReplyInput, Role, Thread, ThreadInput, Ticket,
    TicketInput, TicketPatch, User,
};
use crate::overlay::Removal;
use crate::session::{Route, Session, SessionStore};
use crate::storage::SharedStore;
use crate::store::{self, CabinPolicy, CreatedUser, OverlayStore};
use crate::time::Clock;

/// Default public origin used for signup links.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub label: &'static str,
    pub path: String,
}

/// The landing dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub session: Session,
    pub nav: Vec<NavEntry>,
    pub notices: Vec<Notice>,
    pub outages: Vec<Outage>,
    /// Open tickets of the acting renter. Absent for other roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_tickets: Option<Vec<Ticket>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub session: Session,
    pub user: Option<User>,
    pub property: Option<Property>,
    pub cabin: Option<Cabin>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffQueue {
    pub unassigned: Vec<Ticket>,
    pub assigned: Vec<Ticket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityBoard {
    pub pinned: Vec<Thread>,
    pub regular: Vec<Thread>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: Reply,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDetail {
    pub thread: Thread,
    pub author_name: Option<String>,
    pub replies: Vec<ReplyView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeBoard {
    pub notices: Vec<Notice>,
    pub outages: Vec<Outage>,
}

/// Renter form for a new maintenance request. Property and cabin come from
/// the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketForm {
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    pub description: String,
}

/// Requested session for the role simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSwitch {
    pub role: Role,
    pub user_id: String,
    pub property_id: Option<String>,
    pub cabin_id: Option<String>,
}

/// The portal: fixtures, overlays, and the session, behind route checks.
pub struct Portal {
    fixtures: Fixtures,
    sessions: SessionStore,
    overlays: OverlayStore,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("fixtures", &self.fixtures)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Portal {
    pub fn new(fixtures: Fixtures, store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            fixtures,
            sessions: SessionStore::new(Arc::clone(&store)),
            overlays: OverlayStore::new(store, Arc::clone(&clock)),
            clock,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub const fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub const fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ----- merged record sets -----

    fn all_tickets(&self) -> Result<Vec<Ticket>> {
        self.overlays.merge_tickets(&self.fixtures.tickets()?)
    }

    fn all_users(&self) -> Result<Vec<User>> {
        self.overlays.merge_users(&self.fixtures.users()?)
    }

    fn all_threads(&self) -> Result<Vec<Thread>> {
        self.overlays.merge_threads(&self.fixtures.community()?.threads)
    }

    fn all_notices(&self) -> Result<Vec<Notice>> {
        self.overlays.merge_notices(&self.fixtures.notices()?)
    }

    fn all_outages(&self) -> Result<Vec<Outage>> {
        self.overlays.merge_outages(&self.fixtures.outages()?)
    }

    fn find_ticket(&self, id: &str) -> Result<Ticket> {
        self.all_tickets()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| PortalError::not_found("ticket", id))
    }

    fn find_thread(&self, id: &str) -> Result<Thread> {
        self.all_threads()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| PortalError::not_found("thread", id))
    }

    fn find_user(&self, id: &str) -> Result<User> {
        self.all_users()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| PortalError::not_found("user", id))
    }

    // ----- session -----

    /// Install the demo session if none exists.
    pub fn initialize_demo(&self) -> Result<Session> {
        if self.sessions.initialize_demo()? {
            info!("demo session installed");
        }
        self.sessions.require()
    }

    pub fn profile(&self) -> Result<ProfileView> {
        let session = self.sessions.authorize(&Route::Profile)?;
        let user = self.all_users()?.into_iter().find(|u| u.id == session.user_id);
        let property = self.fixtures.property(&session.property_id)?;
        let cabin = match session.cabin_id.as_deref() {
            Some(id) => self.fixtures.cabin(id)?,
            None => None,
        };
        Ok(ProfileView {
            session,
            user,
            property,
            cabin,
        })
    }

    /// Replace the session with another user. The user must exist with the
    /// requested role; only renters carry a cabin.
    pub fn switch_session(&self, request: SessionSwitch) -> Result<Session> {
        let user = self.find_user(&request.user_id)?;
        if user.role != request.role {
            return Err(PortalError::invalid(format!(
                "user {} is a {}, not a {}",
                user.id, user.role, request.role
            )));
        }

        let property_id = request
            .property_id
            .or_else(|| user.property_ids.first().cloned())
            .ok_or_else(|| PortalError::invalid(format!("user {} has no property", user.id)))?;
        if self.fixtures.property(&property_id)?.is_none() {
            return Err(PortalError::not_found("property", property_id));
        }

        let cabin_id = if request.role == Role::Renter {
            let cabin_id = request.cabin_id.or_else(|| user.cabin_id.clone());
            if let Some(id) = cabin_id.as_deref() {
                let cabin = self
                    .fixtures
                    .cabin(id)?
                    .ok_or_else(|| PortalError::not_found("cabin", id))?;
                if cabin.property_id != property_id {
                    return Err(PortalError::invalid(format!(
                        "cabin {id} belongs to {}, not {property_id}",
                        cabin.property_id
                    )));
                }
            }
            cabin_id
        } else {
            None
        };

        let session = Session {
            role: request.role,
            user_id: user.id,
            property_id,
            cabin_id,
        };
        self.sessions.set(&session)?;
        Ok(session)
    }

    // ----- home -----

    pub fn home(&self) -> Result<HomeView> {
        let session = self.sessions.authorize(&Route::Home)?;
        let now = self.now();

        let notices = self
            .all_notices()?
            .into_iter()
            .filter(|n| n.property_id == session.property_id && n.is_active_at(&now))
            .collect();
        let outages = self
            .all_outages()?
            .into_iter()
            .filter(|o| o.property_id == session.property_id && o.is_active_at(&now))
            .collect();

        let open_tickets = if session.role == Role::Renter {
            Some(
                self.all_tickets()?
                    .into_iter()
                    .filter(|t| t.created_by_user_id == session.user_id && t.status.is_open())
                    .collect(),
            )
        } else {
            None
        };

        let nav = session
            .role
            .nav_routes()
            .into_iter()
            .map(|(label, route)| NavEntry {
                label,
                path: route.path(),
            })
            .collect();

        Ok(HomeView {
            session,
            nav,
            notices,
            outages,
            open_tickets,
        })
    }

    // ----- maintenance -----

    /// The renter's tickets, newest first.
    pub fn my_tickets(&self) -> Result<Vec<Ticket>> {
        let session = self.sessions.authorize(&Route::MaintenanceMy)?;
        let mut tickets: Vec<Ticket> = self
            .all_tickets()?
            .into_iter()
            .filter(|t| t.created_by_user_id == session.user_id)
            .collect();
        tickets.sort_by_key(|t| Reverse(t.created_at));
        Ok(tickets)
    }

    /// One ticket with its assignee's name. Renters open it through the
    /// maintenance screen, staff through the queue.
    pub fn ticket_detail(&self, id: &str) -> Result<TicketDetail> {
        let session = self.sessions.require()?;
        let route = if session.role == Role::Renter {
            Route::MaintenanceDetail(id.to_string())
        } else {
            Route::StaffTicketDetail(id.to_string())
        };
        self.sessions.authorize(&route)?;

        let ticket = self.find_ticket(id)?;
        let assignee_name = match ticket.assigned_to_user_id.as_deref() {
            Some(user_id) if !user_id.is_empty() => self
                .all_users()?
                .into_iter()
                .find(|u| u.id == user_id)
                .map(|u| u.name),
            _ => None,
        };
        Ok(TicketDetail {
            ticket,
            assignee_name,
        })
    }

    pub fn submit_ticket(&self, form: TicketForm) -> Result<Ticket> {
        let session = self.sessions.authorize(&Route::MaintenanceNew)?;
        let cabin_id = session
            .cabin_id
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PortalError::invalid("configure a cabin for this session first"))?;

        let Some(subs) = subcategories(&form.category) else {
            return Err(PortalError::invalid(format!("unknown category '{}'", form.category)));
        };
        if !subs.contains(&form.subcategory.as_str()) {
            return Err(PortalError::invalid(format!(
                "'{}' is not a {} subcategory (expected one of: {})",
                form.subcategory,
                form.category,
                subs.join(", ")
            )));
        }
        let description = non_blank("description", &form.description)?;

        self.overlays.create_ticket(TicketInput {
            property_id: session.property_id,
            cabin_id,
            category: form.category,
            subcategory: form.subcategory,
            priority: form.priority,
            description,
        })
    }

    /// Unassigned tickets of the session property plus the actor's own.
    pub fn staff_queue(&self) -> Result<StaffQueue> {
        let session = self.sessions.authorize(&Route::StaffTickets)?;
        let tickets = self.all_tickets()?;
        let unassigned = tickets
            .iter()
            .filter(|t| t.property_id == session.property_id && is_unassigned(t))
            .cloned()
            .collect();
        let assigned = tickets
            .into_iter()
            .filter(|t| t.assigned_to_user_id.as_deref() == Some(session.user_id.as_str()))
            .collect();
        Ok(StaffQueue {
            unassigned,
            assigned,
        })
    }

    pub fn update_ticket(&self, id: &str, patch: &TicketPatch) -> Result<Ticket> {
        self.sessions.authorize(&Route::StaffTicketDetail(id.to_string()))?;
        self.find_ticket(id)?;
        if let Some(Some(assignee)) = &patch.assigned_to_user_id {
            let user = self.find_user(assignee)?;
            if user.role == Role::Renter {
                return Err(PortalError::invalid(format!(
                    "{assignee} is a renter and cannot take tickets"
                )));
            }
        }
        if let Some(description) = &patch.description {
            non_blank("description", description)?;
        }
        self.overlays.update_ticket(id, patch)?;
        self.find_ticket(id)
    }

    // ----- community -----

    /// Threads of the session property: pinned first, then the rest by
    /// latest activity.
    pub fn community(&self) -> Result<CommunityBoard> {
        let session = self.sessions.authorize(&Route::Community)?;
        let (pinned, mut regular): (Vec<Thread>, Vec<Thread>) = self
            .all_threads()?
            .into_iter()
            .filter(|t| t.property_id == session.property_id)
            .partition(|t| t.is_pinned);
        regular.sort_by_key(|t| Reverse(t.updated_at));
        Ok(CommunityBoard { pinned, regular })
    }

    pub fn thread_detail(&self, id: &str) -> Result<ThreadDetail> {
        self.sessions.authorize(&Route::CommunityThread(id.to_string()))?;
        let thread = self.find_thread(id)?;
        let users = self.all_users()?;
        let name_of = |user_id: &str| {
            users
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.name.clone())
        };

        let mut replies: Vec<Reply> = self
            .overlays
            .merge_replies(&self.fixtures.community()?.replies)?
            .into_iter()
            .filter(|r| r.thread_id == thread.id)
            .collect();
        replies.sort_by_key(|r| r.created_at);

        let replies = replies
            .into_iter()
            .map(|reply| ReplyView {
                author_name: name_of(&reply.created_by_user_id),
                reply,
            })
            .collect();
        debug!(thread = id, "thread detail loaded");
        Ok(ThreadDetail {
            author_name: name_of(&thread.created_by_user_id),
            thread,
            replies,
        })
    }

    pub fn post_thread(&self, title: &str, body_markdown: &str) -> Result<Thread> {
        let session = self.sessions.authorize(&Route::Community)?;
        let title = non_blank("title", title)?;
        let body_markdown = non_blank("body", body_markdown)?;
        self.overlays.create_thread(ThreadInput {
            property_id: session.property_id,
            title,
            body_markdown,
        })
    }

    pub fn post_reply(&self, thread_id: &str, body_markdown: &str) -> Result<Reply> {
        self.sessions.authorize(&Route::CommunityThread(thread_id.to_string()))?;
        let thread = self.find_thread(thread_id)?;
        if thread.is_locked {
            return Err(PortalError::ThreadLocked(thread.id));
        }
        let body_markdown = non_blank("body", body_markdown)?;
        self.overlays.create_reply(ReplyInput {
            thread_id: thread.id,
            body_markdown,
        })
    }

    fn require_admin_on(&self, route: Route) -> Result<Session> {
        let session = self.sessions.authorize(&route)?;
        if session.role == Role::Admin {
            Ok(session)
        } else {
            Err(PortalError::PermissionDenied {
                role: session.role,
                route,
            })
        }
    }

    pub fn set_thread_locked(&self, id: &str, locked: bool) -> Result<Thread> {
        self.require_admin_on(Route::CommunityThread(id.to_string()))?;
        self.find_thread(id)?;
        self.overlays.lock_thread(id, locked)?;
        self.find_thread(id)
    }

    pub fn delete_thread(&self, id: &str) -> Result<Removal> {
        self.require_admin_on(Route::CommunityThread(id.to_string()))?;
        self.find_thread(id)?;
        self.overlays.delete_thread(id)
    }

    // ----- knowledge base -----

    pub fn kb_articles(&self) -> Result<Vec<KbArticle>> {
        let session = self.sessions.authorize(&Route::StaffKb)?;
        Ok(self.fixtures.kb_articles_by_property(&session.property_id)?)
    }

    // ----- notices & outages -----

    pub fn notice_board(&self) -> Result<NoticeBoard> {
        self.sessions.authorize(&Route::AdminNotices)?;
        Ok(NoticeBoard {
            notices: self.all_notices()?,
            outages: self.all_outages()?,
        })
    }

    fn check_properties(&self, property_ids: &[String]) -> Result<()> {
        if property_ids.is_empty() {
            return Err(PortalError::invalid("select at least one property"));
        }
        let known = self.fixtures.properties()?;
        for id in property_ids {
            if !known.iter().any(|p| &p.id == id) {
                return Err(PortalError::not_found("property", id.clone()));
            }
        }
        Ok(())
    }

    pub fn create_notices(&self, input: &NoticeInput) -> Result<Vec<Notice>> {
        self.sessions.authorize(&Route::AdminNotices)?;
        non_blank("title", &input.title)?;
        check_window(input.starts_at, input.ends_at)?;
        self.check_properties(&input.property_ids)?;
        self.overlays.create_notice(input)
    }

    pub fn update_notice(&self, id: &str, patch: &NoticePatch) -> Result<Notice> {
        self.sessions.authorize(&Route::AdminNotices)?;
        let current = find_by_id(self.all_notices()?, id, "notice", |n| &n.id)?;
        check_window(
            patch.starts_at.unwrap_or(current.starts_at),
            patch.ends_at.unwrap_or(current.ends_at),
        )?;
        self.overlays.update_notice(id, patch)?;
        find_by_id(self.all_notices()?, id, "notice", |n| &n.id)
    }

    pub fn delete_notice(&self, id: &str) -> Result<Removal> {
        self.sessions.authorize(&Route::AdminNotices)?;
        find_by_id(self.all_notices()?, id, "notice", |n| &n.id)?;
        self.overlays.delete_notice(id)
    }

    pub fn create_outages(&self, input: &OutageInput) -> Result<Vec<Outage>> {
        self.sessions.authorize(&Route::AdminNotices)?;
        non_blank("title", &input.title)?;
        check_window(input.starts_at, input.ends_at)?;
        self.check_properties(&input.property_ids)?;
        self.overlays.create_outage(input)
    }

    pub fn update_outage(&self, id: &str, patch: &OutagePatch) -> Result<Outage> {
        self.sessions.authorize(&Route::AdminNotices)?;
        let current = find_by_id(self.all_outages()?, id, "outage", |o| &o.id)?;
        check_window(
            patch.starts_at.unwrap_or(current.starts_at),
            patch.ends_at.unwrap_or(current.ends_at),
        )?;
        self.overlays.update_outage(id, patch)?;
        find_by_id(self.all_outages()?, id, "outage", |o| &o.id)
    }

    pub fn delete_outage(&self, id: &str) -> Result<Removal> {
        self.sessions.authorize(&Route::AdminNotices)?;
        find_by_id(self.all_outages()?, id, "outage", |o| &o.id)?;
        self.overlays.delete_outage(id)
    }

    // ----- users -----

    pub fn users(&self) -> Result<Vec<User>> {
        self.sessions.authorize(&Route::AdminUsers)?;
        self.all_users()
    }

    /// Create a pending user. Renters need a cabin, which must belong to the
    /// chosen property and, under [`CabinPolicy::Reject`], be free.
    pub fn create_user(&self, input: CreateUserInput, policy: CabinPolicy) -> Result<CreatedUser> {
        self.sessions.authorize(&Route::AdminUsers)?;
        let name = non_blank("name", &input.name)?;
        let email = input.email.trim().to_string();
        if !email.contains('@') {
            return Err(PortalError::invalid(format!("'{email}' is not an email address")));
        }
        if self.fixtures.property(&input.property_id)?.is_none() {
            return Err(PortalError::not_found("property", input.property_id));
        }
        let renter_cabin = input
            .cabin_id
            .as_deref()
            .filter(|c| input.role == Role::Renter && !c.trim().is_empty());
        if input.role == Role::Renter && renter_cabin.is_none() {
            return Err(PortalError::invalid("renters need a cabin"));
        }
        if let Some(cabin_id) = renter_cabin {
            let cabin = self
                .fixtures
                .cabin(cabin_id)?
                .ok_or_else(|| PortalError::not_found("cabin", cabin_id))?;
            if cabin.property_id != input.property_id {
                return Err(PortalError::invalid(format!(
                    "cabin {cabin_id} is not at property {}",
                    input.property_id
                )));
            }
        }

        let base = self.fixtures.users()?;
        self.overlays.create_user(
            &base,
            CreateUserInput {
                name,
                email,
                ..input
            },
            policy,
        )
    }

    pub fn revoke_user(&self, id: &str) -> Result<User> {
        self.sessions.authorize(&Route::AdminUsers)?;
        self.find_user(id)?;
        self.overlays.revoke_user_access(id)?;
        self.find_user(id)
    }

    pub fn delete_user(&self, id: &str) -> Result<Removal> {
        self.sessions.authorize(&Route::AdminUsers)?;
        self.find_user(id)?;
        self.overlays.delete_user(id)
    }

    /// Signup link for a user that still holds a signup token.
    pub fn signup_url(&self, id: &str) -> Result<String> {
        self.sessions.authorize(&Route::AdminUsers)?;
        let user = self.find_user(id)?;
        let token = user
            .signup_token
            .ok_or_else(|| PortalError::invalid(format!("user {id} has no pending signup")))?;
        Ok(store::signup_url(&self.base_url, &token))
    }

    /// Forget every local change. Any session may do this.
    pub fn reset(&self) -> Result<()> {
        self.overlays.clear_simulated_data()
    }
}

fn non_blank(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PortalError::invalid(format!("{field} must not be blank")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn check_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<()> {
    if ends_at < starts_at {
        return Err(PortalError::invalid("end must not be before start"));
    }
    Ok(())
}

fn find_by_id<T>(
    records: Vec<T>,
    id: &str,
    kind: &'static str,
    id_of: impl Fn(&T) -> &String,
) -> Result<T> {
    records
        .into_iter()
        .find(|r| id_of(r) == id)
        .ok_or_else(|| PortalError::not_found(kind, id))
}
