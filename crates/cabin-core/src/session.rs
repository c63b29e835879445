//! The simulated actor and the role gate in front of every screen.
//!
//! There is exactly one stored [`Session`]. Whoever holds it is the acting
//! user for every read and mutation; switching roles replaces it wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{PortalError, Result};
use crate::model::Role;
use crate::storage::{self, SharedStore};

pub const SESSION_KEY: &str = "cabinPortalSession";

pub const DEMO_USER_ID: &str = "U-1001";
pub const DEMO_PROPERTY_ID: &str = "P-001";
pub const DEMO_CABIN_ID: &str = "C-014";

/// Who the portal is acting as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub role: Role,
    pub user_id: String,
    pub property_id: String,
    #[serde(default)]
    pub cabin_id: Option<String>,
}

impl Session {
    /// The first-visit session: a renter in cabin 14.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            role: Role::Renter,
            user_id: DEMO_USER_ID.to_string(),
            property_id: DEMO_PROPERTY_ID.to_string(),
            cabin_id: Some(DEMO_CABIN_ID.to_string()),
        }
    }
}

/// Every screen the portal serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Profile,
    MaintenanceNew,
    MaintenanceMy,
    MaintenanceDetail(String),
    Community,
    CommunityThread(String),
    StaffTickets,
    StaffTicketDetail(String),
    StaffKb,
    AdminNotices,
    AdminUsers,
}

const RENTER: &[Role] = &[Role::Renter];
const STAFF: &[Role] = &[Role::Staff, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

impl Route {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Profile => "/profile".to_string(),
            Self::MaintenanceNew => "/maintenance/new".to_string(),
            Self::MaintenanceMy => "/maintenance/my".to_string(),
            Self::MaintenanceDetail(id) => format!("/maintenance/{id}"),
            Self::Community => "/community".to_string(),
            Self::CommunityThread(id) => format!("/community/{id}"),
            Self::StaffTickets => "/staff/tickets".to_string(),
            Self::StaffTicketDetail(id) => format!("/staff/tickets/{id}"),
            Self::StaffKb => "/staff/kb".to_string(),
            Self::AdminNotices => "/admin/notices".to_string(),
            Self::AdminUsers => "/admin/users".to_string(),
        }
    }

    /// Roles allowed to open this route. Home and profile accept any session.
    #[must_use]
    pub const fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::Home | Self::Profile | Self::Community | Self::CommunityThread(_) => &Role::ALL,
            Self::MaintenanceNew | Self::MaintenanceMy | Self::MaintenanceDetail(_) => RENTER,
            Self::StaffTickets | Self::StaffTicketDetail(_) | Self::StaffKb => STAFF,
            Self::AdminNotices | Self::AdminUsers => ADMIN,
        }
    }

    /// Map a path to its route. Anything unrecognised lands on home.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["profile"] => Self::Profile,
            ["maintenance", "new"] => Self::MaintenanceNew,
            ["maintenance", "my"] => Self::MaintenanceMy,
            ["maintenance", id] => Self::MaintenanceDetail((*id).to_string()),
            ["community"] => Self::Community,
            ["community", id] => Self::CommunityThread((*id).to_string()),
            ["staff", "tickets"] => Self::StaffTickets,
            ["staff", "tickets", id] => Self::StaffTicketDetail((*id).to_string()),
            ["staff", "kb"] => Self::StaffKb,
            ["admin", "notices"] => Self::AdminNotices,
            ["admin", "users"] => Self::AdminUsers,
            _ => Self::Home,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Role {
    #[must_use]
    pub fn can_access(self, route: &Route) -> bool {
        route.allowed_roles().contains(&self)
    }

    /// Navigation entries shown to this role, in display order.
    #[must_use]
    pub fn nav_routes(self) -> Vec<(&'static str, Route)> {
        let mut nav = vec![("Home", Route::Home)];
        match self {
            Self::Renter => {
                nav.push(("My Tickets", Route::MaintenanceMy));
                nav.push(("New Request", Route::MaintenanceNew));
                nav.push(("Community", Route::Community));
            }
            Self::Staff => {
                nav.push(("Tickets", Route::StaffTickets));
                nav.push(("Knowledge Base", Route::StaffKb));
            }
            Self::Admin => {
                nav.push(("Community", Route::Community));
                nav.push(("Notices & Outages", Route::AdminNotices));
                nav.push(("Users", Route::AdminUsers));
            }
        }
        nav.push(("Profile", Route::Profile));
        nav
    }
}

/// The persisted session record.
#[derive(Clone)]
pub struct SessionStore {
    store: SharedStore,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The current session. A malformed stored record reads as none.
    pub fn get(&self) -> Result<Option<Session>> {
        Ok(storage::load_optional(self.store.as_ref(), SESSION_KEY)?)
    }

    pub fn set(&self, session: &Session) -> Result<()> {
        storage::save(self.store.as_ref(), SESSION_KEY, session)?;
        info!(
            role = %session.role,
            user = %session.user_id,
            property = %session.property_id,
            "session set"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        info!("session cleared");
        Ok(())
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.get()?.is_some())
    }

    pub fn has_role(&self, role: Role) -> Result<bool> {
        Ok(self.get()?.is_some_and(|s| s.role == role))
    }

    pub fn has_any_role(&self, roles: &[Role]) -> Result<bool> {
        Ok(self.get()?.is_some_and(|s| roles.contains(&s.role)))
    }

    pub fn current_user_id(&self) -> Result<Option<String>> {
        Ok(self.get()?.map(|s| s.user_id))
    }

    pub fn current_property_id(&self) -> Result<Option<String>> {
        Ok(self.get()?.map(|s| s.property_id))
    }

    pub fn current_cabin_id(&self) -> Result<Option<String>> {
        Ok(self.get()?.and_then(|s| s.cabin_id))
    }

    /// Install the demo session unless one already exists. Returns whether it
    /// did anything.
    pub fn initialize_demo(&self) -> Result<bool> {
        if self.is_authenticated()? {
            return Ok(false);
        }
        self.set(&Session::demo())?;
        Ok(true)
    }

    /// The session, or `NoSession`.
    pub fn require(&self) -> Result<Session> {
        self.get()?.ok_or(PortalError::NoSession)
    }

    /// The session, provided its role may open `route`.
    pub fn authorize(&self, route: &Route) -> Result<Session> {
        let session = self.require()?;
        if session.role.can_access(route) {
            Ok(session)
        } else {
            Err(PortalError::PermissionDenied {
                role: session.role,
                route: route.clone(),
            })
        }
    }
}
