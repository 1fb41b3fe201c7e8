use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{session_not_found, EventSink, NewProfile, PinStore, Profile, ProfileStore, SessionStore, StoreError, UssdEvent};
use crate::pin::PinRecord;
use crate::ussd::session::SessionRecord;

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    /// phone number -> profile id
    phones: HashMap<String, String>,
    /// profile id -> PIN record
    pins: HashMap<String, PinRecord>,
    sessions: HashMap<String, SessionRecord>,
    events: Vec<UssdEvent>,
}

/// A thread-safe in-memory implementation of every store trait.
///
/// Cloning shares the underlying tables, so a test can keep a handle for
/// assertions while the engine owns another.
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded audit event, oldest first.
    pub async fn events(&self) -> Vec<UssdEvent> {
        self.tables.read().await.events.clone()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStorage {
    async fn get_profile_by_phone(&self, phone_number: &str) -> Result<Option<Profile>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.phones.get(phone_number).and_then(|id| t.profiles.get(id)).cloned())
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(id).cloned())
    }

    async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let mut t = self.tables.write().await;
        if t.phones.contains_key(&new.phone_number) {
            return Err(StoreError::AlreadyExists { entity: "profile", id: new.phone_number });
        }
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            first_name: new.first_name,
            last_name: new.last_name,
            date_of_birth: new.date_of_birth,
            created_at: Utc::now(),
        };
        t.phones.insert(profile.phone_number.clone(), profile.id.clone());
        t.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl PinStore for InMemoryStorage {
    async fn get_pin_by_profile(&self, profile_id: &str) -> Result<Option<PinRecord>, StoreError> {
        Ok(self.tables.read().await.pins.get(profile_id).cloned())
    }

    async fn save_pin(&self, record: PinRecord) -> Result<PinRecord, StoreError> {
        let mut t = self.tables.write().await;
        t.pins.insert(record.profile_id.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl SessionStore for InMemoryStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn get_or_create_session(&self, session_id: &str, phone_number: &str) -> Result<SessionRecord, StoreError> {
        let mut t = self.tables.write().await;
        let record = t
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(session_id, phone_number));
        Ok(record.clone())
    }

    async fn update_session(&self, record: SessionRecord) -> Result<SessionRecord, StoreError> {
        let mut t = self.tables.write().await;
        let stored = t.sessions.get_mut(&record.session_id).ok_or_else(|| session_not_found(&record.session_id))?;
        if stored.version != record.version {
            return Err(StoreError::Conflict {
                session_id: record.session_id,
                expected: record.version,
                found: stored.version,
            });
        }
        let committed = record.committed();
        *stored = committed.clone();
        Ok(committed)
    }
}

#[async_trait]
impl EventSink for InMemoryStorage {
    async fn save_event(&self, event: UssdEvent) -> Result<(), StoreError> {
        self.tables.write().await.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(phone: &str) -> NewProfile {
        NewProfile {
            phone_number: phone.into(),
            first_name: "Achieng".into(),
            last_name: "Otieno".into(),
            date_of_birth: None,
        }
    }

    #[tokio::test]
    async fn profile_lookup_by_phone_and_id() {
        let store = InMemoryStorage::new();
        let created = store.create_profile(new_profile("+254700000001")).await.unwrap();
        let by_phone = store.get_profile_by_phone("+254700000001").await.unwrap().unwrap();
        let by_id = store.get_profile_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_phone, created);
        assert_eq!(by_id, created);
        assert!(store.get_profile_by_phone("+254700000002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let store = InMemoryStorage::new();
        store.create_profile(new_profile("+254700000001")).await.unwrap();
        let err = store.create_profile(new_profile("+254700000001")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_unknown_session_is_not_found() {
        let store = InMemoryStorage::new();
        let err = store.update_session_level("missing", 5, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "session", .. }));
        let err = store.update_session_pin("missing", "1234", 0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get_session("missing").await.unwrap().is_none());
    }
}
