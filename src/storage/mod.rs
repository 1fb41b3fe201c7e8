//! # Storage Module - Collaborator Boundaries
//!
//! The USSD engine never owns persistent state. Profiles, PIN records, gateway
//! sessions and audit events live behind the async traits defined here, so the
//! engine can run against any backing store the host wires in.
//!
//! ## Implementations
//!
//! - [`memory::InMemoryStorage`] - `RwLock`ed maps, used by tests and embedders
//! - [`file::FileStorage`] - JSON documents under a data directory with exclusive
//!   file locking, for single-node deployments
//!
//! ## Layout of the file store
//!
//! ```text
//! data/
//! ├── profiles/       ← one JSON document per profile id
//! ├── phones/         ← phone number → profile id index
//! ├── pins/           ← one PIN record per profile id
//! ├── sessions/       ← gateway session records
//! ├── events.jsonl    ← append-only USSD audit events
//! └── marketing_opt_outs.json
//! ```
//!
//! ## Session concurrency
//!
//! [`SessionStore::update_session`] is a compare-and-swap on
//! [`SessionRecord::version`]. Two callbacks racing on one session cannot both
//! commit: the loser receives [`StoreError::Conflict`].

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::pin::PinRecord;
use crate::ussd::session::SessionRecord;

/// Errors surfaced by collaborator stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("session {session_id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { session_id: String, expected: u64, found: u64 },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt stored document: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A subscriber profile as seen by the USSD engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Fields collected by the registration flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// Lightweight audit record of a USSD action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdEvent {
    pub session_id: String,
    pub phone_number: String,
    pub timestamp: DateTime<Utc>,
    pub event_name: String,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile_by_phone(&self, phone_number: &str) -> Result<Option<Profile>, StoreError>;
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError>;
    /// Fails with [`StoreError::AlreadyExists`] when the phone number already has a profile.
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError>;
}

#[async_trait]
pub trait PinStore: Send + Sync {
    async fn get_pin_by_profile(&self, profile_id: &str) -> Result<Option<PinRecord>, StoreError>;
    /// Upsert keyed by `profile_id`; a profile never holds two PIN records.
    async fn save_pin(&self, record: PinRecord) -> Result<PinRecord, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Idempotent: returns the stored record, or creates one at level 0.
    async fn get_or_create_session(&self, session_id: &str, phone_number: &str) -> Result<SessionRecord, StoreError>;

    /// Persist `record` if the stored version still equals `record.version`.
    /// The returned record carries the bumped version.
    async fn update_session(&self, record: SessionRecord) -> Result<SessionRecord, StoreError>;

    async fn update_session_level(&self, session_id: &str, level: i32, expected_version: u64) -> Result<SessionRecord, StoreError> {
        let mut record = self.get_session(session_id).await?.ok_or_else(|| session_not_found(session_id))?;
        record.level = level;
        record.version = expected_version;
        self.update_session(record).await
    }

    async fn update_session_pin(&self, session_id: &str, pin: &str, expected_version: u64) -> Result<SessionRecord, StoreError> {
        let mut record = self.get_session(session_id).await?.ok_or_else(|| session_not_found(session_id))?;
        record.pin = pin.to_string();
        record.version = expected_version;
        self.update_session(record).await
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn save_event(&self, event: UssdEvent) -> Result<(), StoreError>;
}

pub(crate) fn session_not_found(session_id: &str) -> StoreError {
    StoreError::NotFound { entity: "session", id: session_id.to_string() }
}
