//! Per-kind overlay persistence: the mutation handlers of the portal.
//!
//! Each entity group lives under one key as a whole JSON document. Every
//! mutation is a read-modify-write of that document, taken under the
//! backend's lock when it has one, and persisted in a single write.
//!
//! | Group     | Key                            |
//! |-----------|--------------------------------|
//! | tickets   | `cabinPortal_ticketsOverlay`   |
//! | community | `cabinPortal_communityOverlay` |
//! | notices   | `cabinPortal_noticesOverlay`   |
//! | outages   | `cabinPortal_outagesOverlay`   |
//! | users     | `cabinPortal_usersOverlay`     |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PortalError, Result};
use crate::model::notice::sort_by_start_desc;
use crate::model::{
    CreateUserInput, Notice, NoticeInput, NoticePatch, Outage, OutageInput, OutagePatch, Reply,
    ReplyInput, Role, Thread, ThreadInput, ThreadPatch, Ticket, TicketInput, TicketPatch,
    TicketStatus, User, UserPatch,
};
use crate::overlay::{Entity, Overlay, PatchTarget, Removal, to_patch};
use crate::session::SessionStore;
use crate::storage::{self, SharedStore};
use crate::time::{Clock, generate_id};

pub const TICKETS_KEY: &str = "cabinPortal_ticketsOverlay";
pub const COMMUNITY_KEY: &str = "cabinPortal_communityOverlay";
pub const NOTICES_KEY: &str = "cabinPortal_noticesOverlay";
pub const OUTAGES_KEY: &str = "cabinPortal_outagesOverlay";
pub const USERS_KEY: &str = "cabinPortal_usersOverlay";

/// Every overlay key, in the order `clear_simulated_data` removes them.
pub const OVERLAY_KEYS: [&str; 5] = [
    TICKETS_KEY,
    COMMUNITY_KEY,
    NOTICES_KEY,
    OUTAGES_KEY,
    USERS_KEY,
];

impl Entity for Ticket {
    const KIND: &'static str = "ticket";
    const ID_PREFIX: &'static str = "T";
    const TRACKS_UPDATED_AT: bool = true;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Thread {
    const KIND: &'static str = "thread";
    const ID_PREFIX: &'static str = "TH";
    const TRACKS_UPDATED_AT: bool = true;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Reply {
    const KIND: &'static str = "reply";
    const ID_PREFIX: &'static str = "RP";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Notice {
    const KIND: &'static str = "notice";
    const ID_PREFIX: &'static str = "N";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Outage {
    const KIND: &'static str = "outage";
    const ID_PREFIX: &'static str = "O";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for User {
    const KIND: &'static str = "user";
    const ID_PREFIX: &'static str = "U";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Threads and replies share one persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityOverlay {
    #[serde(default)]
    pub threads: Overlay<Thread>,
    #[serde(default)]
    pub replies: Overlay<Reply>,
}

/// What to do when a new renter's cabin already has an active holder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CabinPolicy {
    /// Refuse with [`PortalError::CabinAssigned`].
    #[default]
    Reject,
    /// Revoke the holder's access, then create.
    RevokeHolder,
}

/// Result of [`OverlayStore::create_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub user: User,
    /// Id of the previous cabin holder whose access was revoked, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_holder_id: Option<String>,
}

/// The active user holding `cabin_id`, if any.
///
/// Pending users (created but not signed up) are inactive and never hold a
/// cabin for conflict purposes.
#[must_use]
pub fn find_cabin_holder<'a>(users: &'a [User], cabin_id: &str) -> Option<&'a User> {
    users
        .iter()
        .find(|u| u.is_active() && u.cabin_id.as_deref() == Some(cabin_id))
}

/// Public signup link for a pending user's token.
#[must_use]
pub fn signup_url(base_url: &str, token: &str) -> String {
    format!("{}/signup/{token}", base_url.trim_end_matches('/'))
}

/// Local overlays for every mutable entity kind.
#[derive(Clone)]
pub struct OverlayStore {
    store: SharedStore,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for OverlayStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayStore").finish_non_exhaustive()
    }
}

impl OverlayStore {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: SessionStore::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    fn read<G: DeserializeOwned + Default>(&self, key: &str) -> Result<G> {
        Ok(storage::load_or_default(self.store.as_ref(), key)?)
    }

    /// Run one locked read-modify-write cycle on the document under `key`.
    fn mutate<G, R>(&self, key: &str, apply: impl FnOnce(&mut G) -> Result<R>) -> Result<R>
    where
        G: Serialize + DeserializeOwned + Default,
    {
        let _guard = self.store.lock()?;
        let mut group: G = storage::load_or_default(self.store.as_ref(), key)?;
        let out = apply(&mut group)?;
        storage::save(self.store.as_ref(), key, &group)?;
        debug!(key, "overlay persisted");
        Ok(out)
    }

    fn acting_user(&self) -> Result<String> {
        self.sessions
            .current_user_id()?
            .filter(|id| !id.is_empty())
            .ok_or(PortalError::NoSession)
    }

    // ----- tickets -----

    pub fn tickets_overlay(&self) -> Result<Overlay<Ticket>> {
        self.read(TICKETS_KEY)
    }

    pub fn merge_tickets(&self, base: &[Ticket]) -> Result<Vec<Ticket>> {
        Ok(self.tickets_overlay()?.merge(base))
    }

    /// Stage a new Open, unassigned ticket created by the session user.
    pub fn create_ticket(&self, input: TicketInput) -> Result<Ticket> {
        let user_id = self.acting_user()?;
        let now = self.clock.now();
        let ticket = Ticket {
            id: generate_id(Ticket::ID_PREFIX, &now),
            property_id: input.property_id,
            cabin_id: input.cabin_id,
            created_by_user_id: user_id,
            assigned_to_user_id: None,
            category: input.category,
            subcategory: input.subcategory,
            priority: input.priority,
            status: TicketStatus::Open,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        self.mutate(TICKETS_KEY, |overlay: &mut Overlay<Ticket>| {
            overlay.stage(ticket.clone());
            Ok(())
        })?;
        info!(id = %ticket.id, cabin = %ticket.cabin_id, "ticket created");
        Ok(ticket)
    }

    pub fn update_ticket(&self, id: &str, patch: &TicketPatch) -> Result<PatchTarget> {
        let patch = to_patch(Ticket::KIND, id, patch)?;
        let now = self.clock.now();
        let target = self.mutate(TICKETS_KEY, |overlay: &mut Overlay<Ticket>| {
            overlay.patch(id, patch, &now)
        })?;
        info!(id, ?target, "ticket updated");
        Ok(target)
    }

    // ----- community -----

    pub fn community_overlay(&self) -> Result<CommunityOverlay> {
        self.read(COMMUNITY_KEY)
    }

    pub fn merge_threads(&self, base: &[Thread]) -> Result<Vec<Thread>> {
        Ok(self.community_overlay()?.threads.merge(base))
    }

    pub fn merge_replies(&self, base: &[Reply]) -> Result<Vec<Reply>> {
        Ok(self.community_overlay()?.replies.merge(base))
    }

    /// Stage a new unpinned, unlocked thread created by the session user.
    pub fn create_thread(&self, input: ThreadInput) -> Result<Thread> {
        let user_id = self.acting_user()?;
        let now = self.clock.now();
        let thread = Thread {
            id: generate_id(Thread::ID_PREFIX, &now),
            property_id: input.property_id,
            created_by_user_id: user_id,
            title: input.title,
            body_markdown: input.body_markdown,
            is_pinned: false,
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        self.mutate(COMMUNITY_KEY, |community: &mut CommunityOverlay| {
            community.threads.stage(thread.clone());
            Ok(())
        })?;
        info!(id = %thread.id, property = %thread.property_id, "thread created");
        Ok(thread)
    }

    pub fn update_thread(&self, id: &str, patch: &ThreadPatch) -> Result<PatchTarget> {
        let patch = to_patch(Thread::KIND, id, patch)?;
        let now = self.clock.now();
        let target = self.mutate(COMMUNITY_KEY, |community: &mut CommunityOverlay| {
            community.threads.patch(id, patch, &now)
        })?;
        info!(id, ?target, "thread updated");
        Ok(target)
    }

    pub fn lock_thread(&self, id: &str, locked: bool) -> Result<PatchTarget> {
        self.update_thread(
            id,
            &ThreadPatch {
                is_locked: Some(locked),
                ..ThreadPatch::default()
            },
        )
    }

    /// Replies of a deleted thread stay in place; they just stop resolving.
    pub fn delete_thread(&self, id: &str) -> Result<Removal> {
        let removal = self.mutate(COMMUNITY_KEY, |community: &mut CommunityOverlay| {
            Ok(community.threads.remove(id))
        })?;
        info!(id, ?removal, "thread deleted");
        Ok(removal)
    }

    pub fn create_reply(&self, input: ReplyInput) -> Result<Reply> {
        let user_id = self.acting_user()?;
        let now = self.clock.now();
        let reply = Reply {
            id: generate_id(Reply::ID_PREFIX, &now),
            thread_id: input.thread_id,
            created_by_user_id: user_id,
            body_markdown: input.body_markdown,
            created_at: now,
        };
        self.mutate(COMMUNITY_KEY, |community: &mut CommunityOverlay| {
            community.replies.stage(reply.clone());
            Ok(())
        })?;
        info!(id = %reply.id, thread = %reply.thread_id, "reply created");
        Ok(reply)
    }

    // ----- notices -----

    pub fn notices_overlay(&self) -> Result<Overlay<Notice>> {
        self.read(NOTICES_KEY)
    }

    /// Merged notices, latest start first.
    pub fn merge_notices(&self, base: &[Notice]) -> Result<Vec<Notice>> {
        let mut merged = self.notices_overlay()?.merge(base);
        sort_by_start_desc(&mut merged);
        Ok(merged)
    }

    /// One notice per property id, all persisted in one write.
    pub fn create_notice(&self, input: &NoticeInput) -> Result<Vec<Notice>> {
        let now = self.clock.now();
        let notices: Vec<Notice> = input
            .property_ids
            .iter()
            .map(|property_id| Notice {
                id: generate_id(Notice::ID_PREFIX, &now),
                property_id: property_id.clone(),
                title: input.title.clone(),
                body_markdown: input.body_markdown.clone(),
                starts_at: input.starts_at,
                ends_at: input.ends_at,
                is_pinned: input.is_pinned,
            })
            .collect();
        self.mutate(NOTICES_KEY, |overlay: &mut Overlay<Notice>| {
            overlay.created.extend(notices.iter().cloned());
            Ok(())
        })?;
        info!(count = notices.len(), title = %input.title, "notices created");
        Ok(notices)
    }

    pub fn update_notice(&self, id: &str, patch: &NoticePatch) -> Result<PatchTarget> {
        let patch = to_patch(Notice::KIND, id, patch)?;
        let now = self.clock.now();
        let target = self.mutate(NOTICES_KEY, |overlay: &mut Overlay<Notice>| {
            overlay.patch(id, patch, &now)
        })?;
        info!(id, ?target, "notice updated");
        Ok(target)
    }

    pub fn delete_notice(&self, id: &str) -> Result<Removal> {
        let removal = self.mutate(NOTICES_KEY, |overlay: &mut Overlay<Notice>| {
            Ok(overlay.remove(id))
        })?;
        info!(id, ?removal, "notice deleted");
        Ok(removal)
    }

    // ----- outages -----

    pub fn outages_overlay(&self) -> Result<Overlay<Outage>> {
        self.read(OUTAGES_KEY)
    }

    /// Merged outages, latest start first.
    pub fn merge_outages(&self, base: &[Outage]) -> Result<Vec<Outage>> {
        let mut merged = self.outages_overlay()?.merge(base);
        sort_by_start_desc(&mut merged);
        Ok(merged)
    }

    /// One outage per property id, all persisted in one write.
    pub fn create_outage(&self, input: &OutageInput) -> Result<Vec<Outage>> {
        let now = self.clock.now();
        let outages: Vec<Outage> = input
            .property_ids
            .iter()
            .map(|property_id| Outage {
                id: generate_id(Outage::ID_PREFIX, &now),
                property_id: property_id.clone(),
                title: input.title.clone(),
                body_markdown: input.body_markdown.clone(),
                starts_at: input.starts_at,
                ends_at: input.ends_at,
                status: input.status,
            })
            .collect();
        self.mutate(OUTAGES_KEY, |overlay: &mut Overlay<Outage>| {
            overlay.created.extend(outages.iter().cloned());
            Ok(())
        })?;
        info!(count = outages.len(), title = %input.title, "outages created");
        Ok(outages)
    }

    pub fn update_outage(&self, id: &str, patch: &OutagePatch) -> Result<PatchTarget> {
        let patch = to_patch(Outage::KIND, id, patch)?;
        let now = self.clock.now();
        let target = self.mutate(OUTAGES_KEY, |overlay: &mut Overlay<Outage>| {
            overlay.patch(id, patch, &now)
        })?;
        info!(id, ?target, "outage updated");
        Ok(target)
    }

    pub fn delete_outage(&self, id: &str) -> Result<Removal> {
        let removal = self.mutate(OUTAGES_KEY, |overlay: &mut Overlay<Outage>| {
            Ok(overlay.remove(id))
        })?;
        info!(id, ?removal, "outage deleted");
        Ok(removal)
    }

    // ----- users -----

    pub fn users_overlay(&self) -> Result<Overlay<User>> {
        self.read(USERS_KEY)
    }

    pub fn merge_users(&self, base: &[User]) -> Result<Vec<User>> {
        Ok(self.users_overlay()?.merge(base))
    }

    /// Stage a pending user with a fresh signup token.
    ///
    /// Only renters keep a cabin. When the cabin has an active holder the
    /// call fails under [`CabinPolicy::Reject`]; under
    /// [`CabinPolicy::RevokeHolder`] the holder is revoked in the same write.
    pub fn create_user(
        &self,
        base: &[User],
        input: CreateUserInput,
        policy: CabinPolicy,
    ) -> Result<CreatedUser> {
        let now = self.clock.now();
        let cabin_id = if input.role == Role::Renter {
            input.cabin_id.filter(|c| !c.is_empty())
        } else {
            None
        };

        let user = User {
            id: generate_id(User::ID_PREFIX, &now),
            email: input.email,
            name: input.name,
            role: input.role,
            property_ids: vec![input.property_id],
            cabin_id,
            signup_token: Some(Uuid::new_v4().to_string()),
            is_active: Some(false),
        };

        let revoked_holder_id = self.mutate(USERS_KEY, |overlay: &mut Overlay<User>| {
            let mut revoked = None;
            if let Some(cabin) = user.cabin_id.as_deref() {
                let merged = overlay.merge(base);
                if let Some(holder) = find_cabin_holder(&merged, cabin) {
                    if policy == CabinPolicy::Reject {
                        return Err(PortalError::CabinAssigned {
                            cabin_id: cabin.to_string(),
                            holder_id: holder.id.clone(),
                            holder_name: holder.name.clone(),
                        });
                    }
                    let holder_id = holder.id.clone();
                    overlay.patch(&holder_id, revoke_patch(&holder_id)?, &now)?;
                    revoked = Some(holder_id);
                }
            }
            overlay.stage(user.clone());
            Ok(revoked)
        })?;

        if let Some(holder) = &revoked_holder_id {
            info!(holder = %holder, cabin = ?user.cabin_id, "previous cabin holder revoked");
        }
        info!(id = %user.id, role = %user.role, "user created");
        Ok(CreatedUser {
            user,
            revoked_holder_id,
        })
    }

    /// Deactivate a user and release their cabin.
    pub fn revoke_user_access(&self, id: &str) -> Result<PatchTarget> {
        let patch = revoke_patch(id)?;
        let now = self.clock.now();
        let target = self.mutate(USERS_KEY, |overlay: &mut Overlay<User>| {
            overlay.patch(id, patch, &now)
        })?;
        info!(id, ?target, "user access revoked");
        Ok(target)
    }

    pub fn delete_user(&self, id: &str) -> Result<Removal> {
        let removal = self.mutate(USERS_KEY, |overlay: &mut Overlay<User>| Ok(overlay.remove(id)))?;
        info!(id, ?removal, "user deleted");
        Ok(removal)
    }

    /// Drop every overlay. The session is left alone.
    pub fn clear_simulated_data(&self) -> Result<()> {
        let _guard = self.store.lock()?;
        for key in OVERLAY_KEYS {
            self.store.remove(key)?;
        }
        info!("simulated data cleared");
        Ok(())
    }
}

fn revoke_patch(id: &str) -> Result<crate::overlay::Patch> {
    to_patch(
        User::KIND,
        id,
        &UserPatch {
            is_active: Some(false),
            cabin_id: Some(None),
            ..UserPatch::default()
        },
    )
}
