//! Test utilities & fixtures.
//! An engine wired to in-memory collaborators plus a dialog driver that builds the
//! gateway's cumulative `text` field the way a real handset session does.

#![allow(dead_code)] // Each test binary uses a different subset.

use std::sync::Arc;

use chrono::NaiveDate;

use bewell_ussd::config::UssdConfig;
use bewell_ussd::crm::InMemoryCrm;
use bewell_ussd::pin::{HashFunction, PinOptions, PinService};
use bewell_ussd::storage::memory::InMemoryStorage;
use bewell_ussd::storage::{NewProfile, Profile, ProfileStore, SessionStore};
use bewell_ussd::ussd::{Collaborators, SessionRecord, UssdEngine, UssdRequest};

pub const PHONE: &str = "+254712345678";
pub const PIN: &str = "1234";

/// Derivation parameters cheap enough for flow tests.
pub fn quick_pin_options() -> PinOptions {
    PinOptions {
        salt_len: 16,
        iterations: 1,
        key_len: 32,
        hash: HashFunction::Sha512,
    }
}

pub struct Harness {
    pub storage: InMemoryStorage,
    pub crm: InMemoryCrm,
    pub engine: Arc<UssdEngine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(UssdConfig::default())
    }

    pub fn with_settings(settings: UssdConfig) -> Self {
        let storage = InMemoryStorage::new();
        let crm = InMemoryCrm::new();
        let collaborators = Collaborators::from_storage(Arc::new(storage.clone()), Arc::new(crm.clone()));
        let engine = UssdEngine::new(collaborators, quick_pin_options(), settings).expect("engine");
        Harness {
            storage,
            crm,
            engine: Arc::new(engine),
        }
    }

    pub fn pins(&self) -> &PinService {
        self.engine.pin_service()
    }

    /// Create a profile born 14 March 1996 holding `pin`.
    pub async fn register(&self, phone: &str, pin: &str, is_otp: bool) -> Profile {
        let profile = self
            .storage
            .create_profile(NewProfile {
                phone_number: phone.to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1996, 3, 14),
            })
            .await
            .expect("create profile");
        self.pins().create_pin(&profile.id, pin, is_otp).await.expect("create pin");
        profile
    }

    pub fn dial(&self, session_id: &str, phone: &str) -> Dialog {
        Dialog {
            engine: self.engine.clone(),
            session_id: session_id.to_string(),
            phone: phone.to_string(),
            text: None,
        }
    }

    pub async fn session(&self, session_id: &str) -> SessionRecord {
        self.storage
            .get_session(session_id)
            .await
            .expect("get session")
            .expect("session exists")
    }

    pub async fn level(&self, session_id: &str) -> i32 {
        self.session(session_id).await.level
    }

    pub async fn event_names(&self) -> Vec<String> {
        self.storage.events().await.into_iter().map(|e| e.event_name).collect()
    }
}

/// One handset session. The first `send` is the initial dial.
pub struct Dialog {
    engine: Arc<UssdEngine>,
    pub session_id: String,
    phone: String,
    text: Option<String>,
}

impl Dialog {
    pub async fn send(&mut self, input: &str) -> String {
        let text = match self.text.take() {
            None => input.to_string(),
            Some(prev) if prev.is_empty() => input.to_string(),
            Some(prev) => format!("{}*{}", prev, input),
        };
        self.text = Some(text.clone());
        let request = UssdRequest::new(self.session_id.clone(), self.phone.clone(), text);
        self.engine.handle(&request).await.to_string()
    }

    /// Initial dial with an empty `text`.
    pub async fn start(&mut self) -> String {
        self.text = None;
        self.send("").await
    }
}
