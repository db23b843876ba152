//! End-to-end session tests.
//!
//! These drive the engine the way a request handler would: a cookie jar per
//! request, a file store shared across requests, and a manual clock.

use std::fs;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use px_session::{
    CookieJar, FileStore, ManualClock, SessionManager, SessionSection, SessionStore,
};

const COOKIE: &str = "px.session";

fn manager(
    dir: &TempDir,
    secret: Option<&str>,
    lifetime: Option<u64>,
) -> (Arc<ManualClock>, SessionManager<FileStore>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000.0));
    let settings = SessionSection {
        session_dir: dir.path().to_path_buf(),
        secret_key: secret.map(str::to_string),
        cookie_lifetime: lifetime,
        ..SessionSection::default()
    };
    let manager = SessionManager::from_settings(settings)
        .unwrap()
        .with_clock(clock.clone());
    (clock, manager)
}

// ============================================================================
// Persistence across requests
// ============================================================================

#[test]
fn test_counter_survives_reconstruction() {
    for secret in [Some("k3y"), None] {
        let dir = TempDir::new().unwrap();
        let (_clock, manager) = manager(&dir, secret, Some(600));

        let mut first = CookieJar::new();
        let mut session = manager.open(&mut first).unwrap();
        session.set("count", 1).unwrap();
        session.save().unwrap();
        let id = session.id();
        drop(session);

        let mut second = first.next_request();
        let mut session = manager.open(&mut second).unwrap();
        assert_eq!(session.id(), id);
        assert_eq!(session.get("count").unwrap(), Some(&json!(1)));
    }
}

#[test]
fn test_composite_values_roundtrip() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, Some("k3y"), None);
    let profile = json!({"name": "ada", "roles": ["admin", "dev"], "age": 36, "ok": true});

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("profile", profile.clone()).unwrap();
    session.save().unwrap();
    drop(session);

    let mut next = jar.next_request();
    let mut session = manager.open(&mut next).unwrap();
    assert_eq!(session.get("profile").unwrap(), Some(&profile));
}

#[test]
fn test_record_file_layout() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, None, None);

    let mut jar = CookieJar::new();
    let id = manager.open(&mut jar).unwrap().id();

    let path = dir.path().join(format!("sess-px-{}", id.to_hex()));
    let contents: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(contents["_sid"], json!(id.to_hex()));
    assert_eq!(contents["_ttl"], json!(604_800));
}

// ============================================================================
// Expiration
// ============================================================================

#[test]
fn test_sliding_expiration_keeps_identity() {
    let dir = TempDir::new().unwrap();
    let (clock, manager) = manager(&dir, Some("k3y"), Some(5));

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("count", 1).unwrap();
    session.save().unwrap();
    let id = session.id();
    drop(session);

    for _ in 0..4 {
        clock.advance(4.0);
        let mut next = jar.next_request();
        let mut session = manager.open(&mut next).unwrap();
        assert_eq!(session.get("count").unwrap(), Some(&json!(1)));
        assert_eq!(session.id(), id);
        session.save().unwrap();
        drop(session);
        jar = next;
    }
}

#[test]
fn test_stale_session_rotates() {
    let dir = TempDir::new().unwrap();
    let (clock, manager) = manager(&dir, Some("k3y"), Some(5));

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("count", 1).unwrap();
    session.save().unwrap();
    let old = session.id();
    drop(session);

    clock.advance(6.0);

    let mut next = jar.next_request();
    let mut session = manager.open(&mut next).unwrap();
    assert_eq!(session.get_or("count", "default").unwrap(), json!("default"));
    assert_ne!(session.id(), old);

    let keys: Vec<String> = session.keys().unwrap().cloned().collect();
    assert_eq!(keys, vec!["_sid", "_ttl", "_utm"]);

    let new = session.id();
    drop(session);
    assert_eq!(manager.store().load(&old).unwrap(), None);
    assert!(manager.store().load(&new).unwrap().is_some());
}

// ============================================================================
// Tampering
// ============================================================================

#[test]
fn test_edited_record_is_treated_as_absent() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, Some("k3y"), Some(600));

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("admin", false).unwrap();
    session.save().unwrap();
    let id = session.id();
    drop(session);

    // Rewrite the stored body without the secret
    let path = manager.store().path_for(&id);
    let mut token = fs::read(&path).unwrap();
    let last = token.len() - 2;
    token[last] = if token[last] == b'A' { b'B' } else { b'A' };
    fs::write(&path, &token).unwrap();

    let mut next = jar.next_request();
    let mut session = manager.open(&mut next).unwrap();
    assert!(session.is_new());
    assert_ne!(session.id(), id);
    assert_eq!(session.get("admin").unwrap(), None);
}

#[test]
fn test_forged_cookie_is_treated_as_absent() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, Some("k3y"), Some(600));

    let mut jar = CookieJar::new();
    let id = manager.open(&mut jar).unwrap().id();

    // Present the bare identifier without the transport signature
    let mut forged = CookieJar::with_cookie(COOKIE, id.to_hex());
    let session = manager.open(&mut forged).unwrap();
    assert!(session.is_new());
    assert_ne!(session.id(), id);
}

#[test]
fn test_swapped_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, None, Some(600));

    let mut victim_jar = CookieJar::new();
    let mut victim = manager.open(&mut victim_jar).unwrap();
    victim.set("user", "victim").unwrap();
    victim.save().unwrap();
    let victim_id = victim.id();
    drop(victim);

    let mut attacker_jar = CookieJar::new();
    let attacker_id = manager.open(&mut attacker_jar).unwrap().id();

    // Copy the victim's record under the attacker's identifier
    let token = manager.store().load(&victim_id).unwrap().unwrap();
    manager.store().save(&attacker_id, &token).unwrap();

    let mut next = attacker_jar.next_request();
    let mut session = manager.open(&mut next).unwrap();
    assert!(session.is_new());
    assert_eq!(session.get("user").unwrap(), None);
}

// ============================================================================
// Destruction
// ============================================================================

#[test]
fn test_destroy_removes_record_and_cookie() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, Some("k3y"), Some(600));

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("count", 1).unwrap();
    session.save().unwrap();
    let id = session.id();
    session.destroy().unwrap();

    assert_eq!(manager.store().load(&id).unwrap(), None);
    assert!(jar.was_deleted(COOKIE));

    let mut next = jar.next_request();
    let session = manager.open(&mut next).unwrap();
    assert!(session.is_new());
    assert_ne!(session.id(), id);
}

#[test]
fn test_store_failure_surfaces() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, None, None);

    let mut jar = CookieJar::new();
    let mut session = manager.open(&mut jar).unwrap();
    session.set("count", 1).unwrap();

    fs::remove_dir_all(dir.path()).unwrap();
    let err = session.save().unwrap_err();
    assert!(matches!(err, px_session::SessionError::Io(_)));
}

#[test]
fn test_unreadable_record_fails_open() {
    let dir = TempDir::new().unwrap();
    let (_clock, manager) = manager(&dir, Some("k3y"), Some(600));

    let mut jar = CookieJar::new();
    let id = manager.open(&mut jar).unwrap().id();

    // A directory where the record file should be cannot be read
    let path = manager.store().path_for(&id);
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    let mut next = jar.next_request();
    let Err(err) = manager.open(&mut next) else {
        panic!("open succeeded over an unreadable record");
    };
    assert!(matches!(err, px_session::SessionError::Io(_)));
    assert!(next.writes().is_empty());
}
