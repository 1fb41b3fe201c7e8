//! Process-wide USSD counters, exposed through `/healthz`.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::FailureKind;

static CALLBACKS: AtomicU64 = AtomicU64::new(0);
static DIALOGS_STARTED: AtomicU64 = AtomicU64::new(0);
static DIALOGS_ENDED: AtomicU64 = AtomicU64::new(0);
static LOGINS_OK: AtomicU64 = AtomicU64::new(0);
static LOGINS_FAILED: AtomicU64 = AtomicU64::new(0);
static LOCKOUTS: AtomicU64 = AtomicU64::new(0);
static REGISTRATIONS: AtomicU64 = AtomicU64::new(0);
static PIN_CHANGES: AtomicU64 = AtomicU64::new(0);
static PIN_RESETS: AtomicU64 = AtomicU64::new(0);
static MARKETING_TOGGLES: AtomicU64 = AtomicU64::new(0);
static STATE_FAILURES: AtomicU64 = AtomicU64::new(0);
static COLLABORATOR_FAILURES: AtomicU64 = AtomicU64::new(0);
static TIMEOUTS: AtomicU64 = AtomicU64::new(0);

pub fn inc_callbacks() {
    CALLBACKS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_dialogs_started() {
    DIALOGS_STARTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_dialogs_ended() {
    DIALOGS_ENDED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_logins_ok() {
    LOGINS_OK.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_logins_failed() {
    LOGINS_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_lockouts() {
    LOCKOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_registrations() {
    REGISTRATIONS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_pin_changes() {
    PIN_CHANGES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_pin_resets() {
    PIN_RESETS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_marketing_toggles() {
    MARKETING_TOGGLES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_timeouts() {
    TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_failure(kind: FailureKind) {
    match kind {
        FailureKind::StateInconsistency => STATE_FAILURES.fetch_add(1, Ordering::Relaxed),
        FailureKind::Collaborator => COLLABORATOR_FAILURES.fetch_add(1, Ordering::Relaxed),
    };
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Snapshot {
    pub callbacks: u64,
    pub dialogs_started: u64,
    pub dialogs_ended: u64,
    pub logins_ok: u64,
    pub logins_failed: u64,
    pub lockouts: u64,
    pub registrations: u64,
    pub pin_changes: u64,
    pub pin_resets: u64,
    pub marketing_toggles: u64,
    pub state_failures: u64,
    pub collaborator_failures: u64,
    pub timeouts: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        callbacks: CALLBACKS.load(Ordering::Relaxed),
        dialogs_started: DIALOGS_STARTED.load(Ordering::Relaxed),
        dialogs_ended: DIALOGS_ENDED.load(Ordering::Relaxed),
        logins_ok: LOGINS_OK.load(Ordering::Relaxed),
        logins_failed: LOGINS_FAILED.load(Ordering::Relaxed),
        lockouts: LOCKOUTS.load(Ordering::Relaxed),
        registrations: REGISTRATIONS.load(Ordering::Relaxed),
        pin_changes: PIN_CHANGES.load(Ordering::Relaxed),
        pin_resets: PIN_RESETS.load(Ordering::Relaxed),
        marketing_toggles: MARKETING_TOGGLES.load(Ordering::Relaxed),
        state_failures: STATE_FAILURES.load(Ordering::Relaxed),
        collaborator_failures: COLLABORATOR_FAILURES.load(Ordering::Relaxed),
        timeouts: TIMEOUTS.load(Ordering::Relaxed),
    }
}
