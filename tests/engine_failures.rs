mod common;

use bewell_ussd::crm::MarketingCrm;
use bewell_ussd::error::{EngineError, FailureKind};
use bewell_ussd::storage::{SessionStore, StoreError};
use bewell_ussd::ussd::UssdRequest;
use common::{Harness, PHONE, PIN};

const GENERIC: &str = "END Something went wrong. Please try again.";

async fn force_level(h: &Harness, session_id: &str, level: i32) {
    let mut session = h.session(session_id).await;
    session.level = level;
    h.storage.update_session(session).await.unwrap();
}

#[tokio::test]
async fn unrecognized_level_is_a_state_error() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-err-1", PHONE);
    d.start().await;
    force_level(&h, "s-err-1", 77).await;

    assert_eq!(d.send("1").await, GENERIC);

    let err = h
        .engine
        .try_handle(&UssdRequest::new("s-err-1", PHONE, "1*1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnrecognizedLevel { level: 77, .. }), "{err}");
    assert_eq!(err.kind(), FailureKind::StateInconsistency);
}

#[tokio::test]
async fn registration_level_for_known_profile_is_rejected() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-err-2", PHONE);
    d.start().await;
    force_level(&h, "s-err-2", 32).await;

    assert_eq!(d.send("14031996").await, GENERIC);
}

#[tokio::test]
async fn unusable_phone_number_fails_before_any_session_exists() {
    let h = Harness::new();
    let mut d = h.dial("s-err-3", "not-a-number");

    assert_eq!(d.start().await, GENERIC);
    assert!(h.storage.get_session("s-err-3").await.unwrap().is_none());
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let h = Harness::new();
    let first = h.storage.get_or_create_session("s-err-4", PHONE).await.unwrap();
    let stale = first.clone();

    let mut winner = first;
    winner.level = 5;
    let stored = h.storage.update_session(winner).await.unwrap();
    assert_eq!(stored.version, 1);

    let mut loser = stale;
    loser.level = 50;
    let err = h.storage.update_session(loser).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { expected: 0, found: 1, .. }), "{err}");
    assert_eq!(EngineError::from(err).kind(), FailureKind::StateInconsistency);
    assert_eq!(h.level("s-err-4").await, 5);
}

#[tokio::test]
async fn crm_failure_at_login_leaves_session_at_login() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-err-5", PHONE);
    d.start().await;
    h.crm.set_unavailable(true).await;

    assert_eq!(d.send(PIN).await, GENERIC);
    assert_eq!(h.level("s-err-5").await, 0);
}

#[tokio::test]
async fn session_id_from_another_number_is_refused() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-err-9", PHONE);
    d.start().await;
    assert!(d.send(PIN).await.starts_with("CON Welcome to Be.Well"));

    let other = UssdRequest::new("s-err-9", "+254700000999", format!("{PIN}*1"));
    assert_eq!(h.engine.handle(&other).await.to_string(), GENERIC);
    assert!(!h.crm.is_opted_out(PHONE).await.unwrap());
    assert!(h.event_names().await.is_empty());
    assert_eq!(h.level("s-err-9").await, 5);

    let err = h.engine.try_handle(&other).await.unwrap_err();
    assert!(matches!(err, EngineError::SessionPhoneMismatch { .. }), "{err}");
    assert_eq!(err.kind(), FailureKind::StateInconsistency);
}
