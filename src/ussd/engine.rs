use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};

use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, RegistrationStep};
use super::{extract_latest_input, UssdRequest};
use crate::config::UssdConfig;
use crate::crm::MarketingCrm;
use crate::error::EngineError;
use crate::logutil::{mask_phone, redact_input};
use crate::metrics;
use crate::pin::{PinError, PinOptions, PinService};
use crate::storage::{EventSink, PinStore, ProfileStore, SessionStore, UssdEvent};
use crate::validation::normalize_phone_number;

pub const EVENT_OPTED_OUT_OF_MARKETING: &str = "OPTED_OUT_OF_MARKETING";
pub const EVENT_OPTED_IN_TO_MARKETING: &str = "OPTED_IN_TO_MARKETING";
pub const EVENT_CHANGED_PIN: &str = "CHANGED_PIN";
pub const EVENT_RESET_PIN: &str = "RESET_PIN";
pub const EVENT_COMPLETED_REGISTRATION: &str = "COMPLETED_REGISTRATION";

/// Stores and services the engine runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: Arc<dyn ProfileStore>,
    pub pins: Arc<dyn PinStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub crm: Arc<dyn MarketingCrm>,
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// All four stores served by one backend, plus a CRM.
    pub fn from_storage<S>(storage: Arc<S>, crm: Arc<dyn MarketingCrm>) -> Self
    where
        S: ProfileStore + PinStore + SessionStore + EventSink + 'static,
    {
        Self {
            profiles: storage.clone(),
            pins: storage.clone(),
            sessions: storage.clone(),
            crm,
            events: storage,
        }
    }
}

/// # USSD Engine
///
/// Turns one gateway callback into one response. The engine keeps no state of its
/// own between callbacks: the dialog position is read from the session store at the
/// start of every request and written back through version-checked updates.
///
/// ## Failure policy
///
/// Bad input is answered with a corrective `CON` prompt by the flow handlers.
/// Anything else ([`EngineError`]) is logged with its kind and cause and the
/// subscriber sees the generic `END` text.
pub struct UssdEngine {
    pub(super) profiles: Arc<dyn ProfileStore>,
    pub(super) sessions: Arc<dyn SessionStore>,
    pub(super) crm: Arc<dyn MarketingCrm>,
    pub(super) events: Arc<dyn EventSink>,
    pub(super) pins: PinService,
    pub(super) settings: UssdConfig,
}

impl UssdEngine {
    pub fn new(collaborators: Collaborators, pin_options: PinOptions, settings: UssdConfig) -> Result<Self, PinError> {
        let pins = PinService::new(collaborators.pins, pin_options)?;
        Ok(Self {
            profiles: collaborators.profiles,
            sessions: collaborators.sessions,
            crm: collaborators.crm,
            events: collaborators.events,
            pins,
            settings,
        })
    }

    pub fn pin_service(&self) -> &PinService {
        &self.pins
    }

    /// Answer a callback. Never fails; internal errors become the generic `END` text.
    pub async fn handle(&self, request: &UssdRequest) -> UssdResponse {
        metrics::inc_callbacks();
        let response = match self.try_handle(request).await {
            Ok(response) => response,
            Err(e) => {
                let kind = e.kind();
                metrics::record_failure(kind);
                error!(
                    "USSD callback failed session={} phone={} kind={} cause={}",
                    request.session_id,
                    mask_phone(&request.phone_number),
                    kind.as_str(),
                    e
                );
                UssdResponse::generic_failure()
            }
        };
        if response.is_terminal() {
            metrics::inc_dialogs_ended();
        }
        response
    }

    /// Answer a callback, surfacing internal failures.
    pub async fn try_handle(&self, request: &UssdRequest) -> Result<UssdResponse, EngineError> {
        let phone = normalize_phone_number(&request.phone_number, &self.settings.default_country_code)?;
        let mut session = self.sessions.get_or_create_session(&request.session_id, &phone).await?;
        if session.phone_number != phone {
            warn!(
                target: "security",
                "session={} reused by another number phone={}",
                session.session_id,
                mask_phone(&phone)
            );
            return Err(EngineError::SessionPhoneMismatch {
                session_id: session.session_id.clone(),
            });
        }
        if session.version == 0 && request.text.is_empty() {
            metrics::inc_dialogs_started();
        }
        let input = extract_latest_input(&request.text);

        let Some(profile) = self.profiles.get_profile_by_phone(&phone).await? else {
            let step = RegistrationStep::from_level(session.level);
            debug!(
                "session={} phone={} state=registration/{:?} input={}",
                session.session_id,
                mask_phone(&phone),
                step,
                redact_input(input)
            );
            return self.handle_registration(&mut session, step, input).await;
        };

        let state = DialogState::from_level(session.level).ok_or_else(|| EngineError::UnrecognizedLevel {
            session_id: session.session_id.clone(),
            level: session.level,
        })?;
        debug!(
            "session={} phone={} state={} input={}",
            session.session_id,
            mask_phone(&phone),
            state,
            redact_input(input)
        );

        match state {
            DialogState::Login => self.handle_login(&mut session, &profile, input).await,
            DialogState::Home => self.handle_home(&mut session, input).await,
            DialogState::PinReset(step) => self.handle_pin_reset(&mut session, &profile, step, input).await,
            DialogState::PinChange(step) => self.handle_pin_change(&mut session, &profile, step, input).await,
            // The registration band belongs to numbers without a profile
            DialogState::Registration(_) => Err(EngineError::UnrecognizedLevel {
                session_id: session.session_id.clone(),
                level: session.level,
            }),
        }
    }

    /// Move the session to `state`. No write when it is already there.
    pub(super) async fn move_to(&self, session: &mut SessionRecord, state: DialogState) -> Result<(), EngineError> {
        let level = state.level();
        if session.level == level {
            return Ok(());
        }
        *session = self
            .sessions
            .update_session_level(&session.session_id, level, session.version)
            .await?;
        Ok(())
    }

    /// Hold a not yet confirmed PIN on the session.
    pub(super) async fn remember_pin(&self, session: &mut SessionRecord, pin: &str) -> Result<(), EngineError> {
        *session = self
            .sessions
            .update_session_pin(&session.session_id, pin, session.version)
            .await?;
        Ok(())
    }

    /// Persist every field of `session`.
    pub(super) async fn save(&self, session: &mut SessionRecord) -> Result<(), EngineError> {
        *session = self.sessions.update_session(session.clone()).await?;
        Ok(())
    }

    pub(super) async fn record_event(&self, session: &SessionRecord, event_name: &str) -> Result<(), EngineError> {
        info!(
            "USSD event {} session={} phone={}",
            event_name,
            session.session_id,
            mask_phone(&session.phone_number)
        );
        self.events
            .save_event(UssdEvent {
                session_id: session.session_id.clone(),
                phone_number: session.phone_number.clone(),
                timestamp: Utc::now(),
                event_name: event_name.to_string(),
            })
            .await?;
        Ok(())
    }
}
