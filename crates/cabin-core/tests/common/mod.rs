#![allow(dead_code)]

use cabin_core::Portal;
use cabin_core::fixtures::Fixtures;
use cabin_core::session::Session;
use cabin_core::model::Role;
use cabin_core::storage::{MemoryStore, SharedStore};
use cabin_core::time::FixedClock;
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

pub const PROPERTIES: &str = r#"[
  {"id":"P-001","name":"Grace Springs","address":"1 Pine Rd","timezone":"America/Denver"},
  {"id":"P-002","name":"Cedar Hollow","address":"9 Cedar Ln","timezone":"America/Denver"}
]"#;

pub const CABINS: &str = r#"[
  {"id":"C-014","propertyId":"P-001","name":"Cabin 14","status":"Active"},
  {"id":"C-002","propertyId":"P-001","name":"Cabin 2","status":"Active"},
  {"id":"C-020","propertyId":"P-001","name":"Cabin 20","status":"Maintenance"},
  {"id":"C-101","propertyId":"P-002","name":"Cabin 101","status":"Active"}
]"#;

pub const USERS: &str = r#"[
  {"id":"U-1001","email":"jamie@example.test","name":"Jamie Rivers","role":"Renter","propertyIds":["P-001"],"cabinId":"C-014"},
  {"id":"U-1002","email":"sam@example.test","name":"Sam Ortiz","role":"Renter","propertyIds":["P-001"],"cabinId":"C-002"},
  {"id":"U-2001","email":"pat@example.test","name":"Pat Staff","role":"Staff","propertyIds":["P-001","P-002"],"cabinId":null},
  {"id":"U-3001","email":"alex@example.test","name":"Alex Admin","role":"Admin","propertyIds":["P-001","P-002"],"cabinId":null}
]"#;

pub const TICKETS: &str = r#"[
  {"id":"T-1001","propertyId":"P-001","cabinId":"C-014","createdByUserId":"U-1001","assignedToUserId":null,"category":"Plumbing","subcategory":"Leak","priority":"High","status":"Open","description":"Kitchen sink drips","createdAt":"2025-01-02T10:00:00Z","updatedAt":"2025-01-02T10:00:00Z"},
  {"id":"T-1002","propertyId":"P-001","cabinId":"C-002","createdByUserId":"U-1002","assignedToUserId":"U-2001","category":"HVAC","subcategory":"Heating","priority":"Urgent","status":"Assigned","description":"No heat","createdAt":"2025-01-03T10:00:00Z","updatedAt":"2025-01-03T10:00:00Z"},
  {"id":"T-1003","propertyId":"P-001","cabinId":"C-014","createdByUserId":"U-1001","assignedToUserId":"U-2001","category":"Electrical","subcategory":"Outlet","priority":"Low","status":"Resolved","description":"Dead outlet","createdAt":"2025-01-01T10:00:00Z","updatedAt":"2025-01-04T10:00:00Z"}
]"#;

pub const NOTICES: &str = r#"[
  {"id":"N-001","propertyId":"P-001","title":"Pool closed","bodyMarkdown":"Resurfacing","startsAt":"2025-01-01T00:00:00Z","endsAt":"2025-01-31T00:00:00Z","isPinned":true},
  {"id":"N-002","propertyId":"P-001","title":"Quiet hours","bodyMarkdown":"10pm to 7am","startsAt":"2025-01-10T00:00:00Z","endsAt":"2025-02-10T00:00:00Z","isPinned":false},
  {"id":"N-003","propertyId":"P-002","title":"Elsewhere","bodyMarkdown":"Other property","startsAt":"2025-01-05T00:00:00Z","endsAt":"2025-01-25T00:00:00Z","isPinned":false}
]"#;

pub const OUTAGES: &str = r#"[
  {"id":"O-001","propertyId":"P-001","title":"Water main","bodyMarkdown":"Repairs","startsAt":"2025-01-15T08:00:00Z","endsAt":"2025-01-15T16:00:00Z","status":"Active"},
  {"id":"O-002","propertyId":"P-001","title":"Power","bodyMarkdown":"Past","startsAt":"2024-12-01T08:00:00Z","endsAt":"2024-12-01T16:00:00Z","status":"Resolved"}
]"#;

pub const COMMUNITY: &str = r#"{
  "threads": [
    {"id":"TH-001","propertyId":"P-001","createdByUserId":"U-3001","title":"Welcome","bodyMarkdown":"Say hi","isPinned":true,"createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"},
    {"id":"TH-002","propertyId":"P-001","createdByUserId":"U-1001","title":"Hiking group","bodyMarkdown":"Saturdays","isPinned":false,"createdAt":"2025-01-02T00:00:00Z","updatedAt":"2025-01-08T00:00:00Z"},
    {"id":"TH-003","propertyId":"P-001","createdByUserId":"U-1002","title":"Lost cat","bodyMarkdown":"Grey tabby","isPinned":false,"isLocked":true,"createdAt":"2025-01-03T00:00:00Z","updatedAt":"2025-01-04T00:00:00Z"},
    {"id":"TH-004","propertyId":"P-002","createdByUserId":"U-3001","title":"Other site","bodyMarkdown":"x","isPinned":false,"createdAt":"2025-01-03T00:00:00Z","updatedAt":"2025-01-03T00:00:00Z"}
  ],
  "replies": [
    {"id":"RP-001","threadId":"TH-002","createdByUserId":"U-1002","bodyMarkdown":"Count me in","createdAt":"2025-01-08T00:00:00Z"},
    {"id":"RP-002","threadId":"TH-002","createdByUserId":"U-1001","bodyMarkdown":"Great","createdAt":"2025-01-07T00:00:00Z"}
  ]
}"#;

pub const KB: &str = r#"[
  {"id":"KB-001","propertyId":"P-001","title":"Reset breaker","symptoms":"No power","stepsMarkdown":"1. Open panel","tags":["electrical"],"createdByUserId":"U-2001","upvotes":4,"createdAt":"2024-06-01T00:00:00Z","updatedAt":"2024-06-01T00:00:00Z"},
  {"id":"KB-002","propertyId":"P-002","title":"Relight pilot","symptoms":"No hot water","stepsMarkdown":"1. Turn knob","tags":["plumbing"],"createdByUserId":"U-2001","upvotes":1,"createdAt":"2024-06-01T00:00:00Z","updatedAt":"2024-06-01T00:00:00Z"}
]"#;

pub fn write_fixtures(dir: &Path) {
    for (file, body) in [
        ("properties.json", PROPERTIES),
        ("cabins.json", CABINS),
        ("users.json", USERS),
        ("tickets.json", TICKETS),
        ("notices.json", NOTICES),
        ("outages.json", OUTAGES),
        ("community.json", COMMUNITY),
        ("kb.json", KB),
    ] {
        std::fs::write(dir.join(file), body).expect("write fixture");
    }
}

pub fn noon_jan_15() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0)
        .single()
        .expect("valid date")
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub portal: Portal,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(noon_jan_15()));
    let shared: SharedStore = store.clone();
    let portal = Portal::new(Fixtures::from_dir(dir.path()), shared, clock.clone())
        .with_base_url("https://cabins.example/");
    Harness {
        dir,
        store,
        clock,
        portal,
    }
}

pub fn act_as(h: &Harness, role: Role, user_id: &str, cabin_id: Option<&str>) {
    h.portal
        .sessions()
        .set(&Session {
            role,
            user_id: user_id.to_string(),
            property_id: "P-001".to_string(),
            cabin_id: cabin_id.map(str::to_string),
        })
        .expect("set session");
}
