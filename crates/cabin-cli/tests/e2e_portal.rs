//! E2E tests for the `cabin` binary.
//!
//! Each test writes a small fixture set into an isolated temp directory and
//! runs `cabin` there, so the default `data/` fixtures and `.cabin/state`
//! store both live inside the temp dir.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const PROPERTIES: &str = r#"[
  {"id":"P-001","name":"Grace Springs","address":"1 Pine Rd","timezone":"America/Denver"},
  {"id":"P-002","name":"Cedar Hollow","address":"9 Cedar Ln","timezone":"America/Denver"}
]"#;

const CABINS: &str = r#"[
  {"id":"C-014","propertyId":"P-001","name":"Cabin 14","status":"Active"},
  {"id":"C-015","propertyId":"P-001","name":"Cabin 15","status":"Active"}
]"#;

const USERS: &str = r#"[
  {"id":"U-1001","email":"jamie@example.test","name":"Jamie Rivers","role":"Renter","propertyIds":["P-001"],"cabinId":"C-014"},
  {"id":"U-2001","email":"pat@example.test","name":"Pat Staff","role":"Staff","propertyIds":["P-001"]},
  {"id":"U-3001","email":"alex@example.test","name":"Alex Admin","role":"Admin","propertyIds":["P-001","P-002"]}
]"#;

const TICKETS: &str = r#"[
  {"id":"T-1001","propertyId":"P-001","cabinId":"C-014","createdByUserId":"U-1001","assignedToUserId":null,"category":"Plumbing","subcategory":"Leak","priority":"High","status":"Open","description":"Kitchen sink drips","createdAt":"2025-01-02T10:00:00Z","updatedAt":"2025-01-02T10:00:00Z"}
]"#;

const NOTICES: &str = r#"[
  {"id":"N-001","propertyId":"P-001","title":"Quiet hours","bodyMarkdown":"10pm to 7am","startsAt":"2020-01-01T00:00:00Z","endsAt":"2099-01-01T00:00:00Z","isPinned":true},
  {"id":"N-002","propertyId":"P-001","title":"Old news","bodyMarkdown":"x","startsAt":"2020-01-01T00:00:00Z","endsAt":"2020-01-02T00:00:00Z","isPinned":false}
]"#;

const OUTAGES: &str = "[]";

const COMMUNITY: &str = r#"{
  "threads": [
    {"id":"TH-001","propertyId":"P-001","createdByUserId":"U-1001","title":"Hiking group","bodyMarkdown":"Saturdays","isPinned":false,"createdAt":"2025-01-02T00:00:00Z","updatedAt":"2025-01-08T00:00:00Z"},
    {"id":"TH-002","propertyId":"P-001","createdByUserId":"U-3001","title":"Rules","bodyMarkdown":"Read me","isPinned":true,"isLocked":true,"createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"}
  ],
  "replies": []
}"#;

const KB: &str = r#"[
  {"id":"KB-001","propertyId":"P-001","title":"Reset breaker","symptoms":"No power","stepsMarkdown":"1. Open panel","tags":["electrical"],"createdByUserId":"U-2001","upvotes":4,"createdAt":"2024-06-01T00:00:00Z","updatedAt":"2024-06-01T00:00:00Z"}
]"#;

/// Create a temp project with fixtures under `data/`.
fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).expect("mkdir data");
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
        std::fs::write(data.join(file), body).expect("write fixture");
    }
    dir
}

/// Build a Command targeting the cabin binary, rooted in `dir`.
fn cabin_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cabin"));
    cmd.current_dir(dir);
    // Keep the user's own config and environment out of the run.
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("CABIN_FIXTURES");
    cmd.env_remove("CABIN_STATE_DIR");
    cmd.env_remove("FORMAT");
    cmd.env("CABIN_LOG", "error");
    cmd
}

/// Run with `--json` and parse stdout, asserting success.
fn cabin_json(dir: &Path, args: &[&str]) -> Value {
    let output = cabin_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("cabin should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn act_as_admin(dir: &Path) {
    cabin_json(dir, &["session", "switch", "--role", "Admin", "--user", "U-3001"]);
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[test]
fn home_without_session_fails_with_hint() {
    let dir = project();
    cabin_cmd(dir.path())
        .arg("home")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("cabin session demo"));
}

#[test]
fn demo_session_sees_active_notices_and_open_tickets() {
    let dir = project();
    let session = cabin_json(dir.path(), &["session", "demo"]);
    assert_eq!(session["userId"], "U-1001");
    assert_eq!(session["cabinId"], "C-014");

    let home = cabin_json(dir.path(), &["home"]);
    let notices = home["notices"].as_array().expect("notices");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["id"], "N-001");
    assert_eq!(home["openTickets"][0]["id"], "T-1001");
}

#[test]
fn errors_are_json_objects_in_json_mode() {
    let dir = project();
    cabin_json(dir.path(), &["session", "demo"]);
    let output = cabin_cmd(dir.path())
        .args(["tickets", "queue", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(err["error"]["error_code"], "E2002");
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[test]
fn submitted_ticket_persists_between_runs() {
    let dir = project();
    cabin_json(dir.path(), &["session", "demo"]);

    let ticket = cabin_json(
        dir.path(),
        &[
            "tickets",
            "new",
            "--category",
            "HVAC",
            "--subcategory",
            "Thermostat",
            "--priority",
            "urgent",
            "-d",
            "Display is blank",
        ],
    );
    let id = ticket["id"].as_str().expect("id");
    assert!(id.starts_with("T-"));
    assert_eq!(ticket["priority"], "Urgent");

    let mine = cabin_json(dir.path(), &["tickets", "mine"]);
    let ids: Vec<&str> = mine
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(ids, [id, "T-1001"]);
    assert!(dir.path().join(".cabin/state").is_dir());
}

#[test]
fn bad_subcategory_is_rejected() {
    let dir = project();
    cabin_json(dir.path(), &["session", "demo"]);
    cabin_cmd(dir.path())
        .args(["tickets", "new", "--category", "HVAC", "--subcategory", "Leak", "-d", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2006"));
}

#[test]
fn staff_take_and_resolve_a_ticket() {
    let dir = project();
    cabin_json(dir.path(), &["session", "switch", "--role", "Staff", "--user", "U-2001"]);

    let queue = cabin_json(dir.path(), &["tickets", "queue"]);
    assert_eq!(queue["unassigned"][0]["id"], "T-1001");

    let updated = cabin_json(
        dir.path(),
        &["tickets", "update", "T-1001", "--assign", "U-2001", "--status", "In Progress"],
    );
    assert_eq!(updated["status"], "In Progress");
    assert_eq!(updated["assignedToUserId"], "U-2001");
    assert_eq!(updated["description"], "Kitchen sink drips");

    let queue = cabin_json(dir.path(), &["tickets", "queue"]);
    assert!(queue["unassigned"].as_array().expect("array").is_empty());
    assert_eq!(queue["assigned"][0]["id"], "T-1001");
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

#[test]
fn locked_thread_refuses_replies() {
    let dir = project();
    cabin_json(dir.path(), &["session", "demo"]);
    cabin_cmd(dir.path())
        .args(["threads", "reply", "TH-002", "--body", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"));

    let reply = cabin_json(dir.path(), &["threads", "reply", "TH-001", "--body", "count me in"]);
    assert_eq!(reply["threadId"], "TH-001");
    let detail = cabin_json(dir.path(), &["threads", "show", "TH-001"]);
    assert_eq!(detail["replies"][0]["authorName"], "Jamie Rivers");
}

#[test]
fn admin_deletes_a_fixture_thread() {
    let dir = project();
    act_as_admin(dir.path());
    let outcome = cabin_json(dir.path(), &["threads", "delete", "TH-001"]);
    assert_eq!(outcome["removal"], "tombstoned");
    cabin_cmd(dir.path())
        .args(["threads", "show", "TH-001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[test]
fn notice_fans_out_per_property() {
    let dir = project();
    act_as_admin(dir.path());
    let created = cabin_json(
        dir.path(),
        &[
            "notices",
            "new",
            "--title",
            "Snow plowing",
            "--starts",
            "2025-01-20T09:00:00Z",
            "--ends",
            "2025-01-20T15:00:00Z",
            "--property",
            "P-001",
            "--property",
            "P-002",
        ],
    );
    let created = created.as_array().expect("array");
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["propertyId"], "P-001");
    assert_eq!(created[1]["propertyId"], "P-002");
    assert_ne!(created[0]["id"], created[1]["id"]);
}

#[test]
fn cabin_conflict_then_revoke() {
    let dir = project();
    act_as_admin(dir.path());
    let new_user = [
        "users",
        "new",
        "--email",
        "robin@example.test",
        "--name",
        "Robin",
        "--role",
        "Renter",
        "--property",
        "P-001",
        "--cabin",
        "C-014",
    ];

    cabin_cmd(dir.path())
        .args(new_user)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"))
        .stderr(predicate::str::contains("Jamie Rivers"));

    let mut with_revoke = new_user.to_vec();
    with_revoke.push("--revoke-conflict");
    let invitation = cabin_json(dir.path(), &with_revoke);
    assert_eq!(invitation["revokedHolderId"], "U-1001");
    let url = invitation["signupUrl"].as_str().expect("signup url");
    assert!(url.starts_with("http://localhost:5173/signup/"), "{url}");

    let users = cabin_json(dir.path(), &["users", "list"]);
    let jamie = users
        .as_array()
        .expect("array")
        .iter()
        .find(|u| u["id"] == "U-1001")
        .expect("jamie listed");
    assert_eq!(jamie["isActive"], false);
}

#[test]
fn reset_drops_local_changes() {
    let dir = project();
    act_as_admin(dir.path());
    cabin_json(dir.path(), &["notices", "delete", "N-001"]);
    let board = cabin_json(dir.path(), &["notices", "list"]);
    assert_eq!(board.as_array().expect("array").len(), 1);

    cabin_cmd(dir.path()).arg("reset").assert().success();
    let board = cabin_json(dir.path(), &["notices", "list"]);
    assert_eq!(board.as_array().expect("array").len(), 2);
}

#[test]
fn missing_fixtures_point_at_the_flag() {
    let dir = TempDir::new().expect("tempdir");
    cabin_json(dir.path(), &["session", "demo"]);
    cabin_cmd(dir.path())
        .arg("home")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1003"))
        .stderr(predicate::str::contains("--fixtures"));
}

#[test]
fn malformed_config_reports_code_and_hint() {
    let dir = project();
    std::fs::create_dir_all(dir.path().join(".cabin")).expect("mkdir");
    std::fs::write(dir.path().join(".cabin/config.toml"), "[fixtures\n").expect("write config");
    cabin_cmd(dir.path())
        .arg("home")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1002]: invalid config in"))
        .stderr(predicate::str::contains("suggestion:"));
}

#[test]
fn help_shows_examples() {
    let dir = project();
    cabin_cmd(dir.path())
        .args(["tickets", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXAMPLES:"));
}
