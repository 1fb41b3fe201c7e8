use log::warn;

use super::engine::UssdEngine;
use super::menu;
use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, PinChangeStep, PinResetStep};
use crate::error::EngineError;
use crate::logutil::mask_phone;
use crate::metrics;
use crate::pin::PinVerification;
use crate::storage::Profile;

pub(super) const FORGOT_PIN_INPUT: &str = "00";

impl UssdEngine {
    /// Level 0 for a registered number: greet, then check the PIN.
    pub(super) async fn handle_login(
        &self,
        session: &mut SessionRecord,
        profile: &Profile,
        input: &str,
    ) -> Result<UssdResponse, EngineError> {
        if self.is_locked(session) {
            return Ok(menu::login_locked());
        }
        if input.is_empty() {
            return Ok(menu::login_welcome(&profile.first_name));
        }
        if input == FORGOT_PIN_INPUT {
            self.move_to(session, DialogState::PinReset(PinResetStep::DateOfBirth)).await?;
            return Ok(menu::date_of_birth_prompt());
        }

        match self.pins.verify(&profile.id, input).await? {
            PinVerification::Missing => Err(EngineError::MissingPin {
                profile_id: profile.id.clone(),
            }),
            PinVerification::Invalid => self.reject_login_pin(session).await,
            PinVerification::Valid { is_otp: true } => {
                metrics::inc_logins_ok();
                session.failed_pin_attempts = 0;
                session.level = DialogState::PinChange(PinChangeStep::NewPin).level();
                self.save(session).await?;
                Ok(menu::temporary_pin_must_change())
            }
            PinVerification::Valid { is_otp: false } => {
                let opted_out = self.crm.is_opted_out(&session.phone_number).await?;
                metrics::inc_logins_ok();
                session.failed_pin_attempts = 0;
                session.level = DialogState::Home.level();
                self.save(session).await?;
                Ok(menu::home_menu(opted_out))
            }
        }
    }

    async fn reject_login_pin(&self, session: &mut SessionRecord) -> Result<UssdResponse, EngineError> {
        metrics::inc_logins_failed();
        if self.record_failed_attempt(session, "wrong PIN").await? {
            return Ok(menu::login_locked());
        }
        Ok(menu::wrong_login_pin())
    }

    /// Wrong PINs and wrong dates of birth share one per-session budget.
    pub(super) fn is_locked(&self, session: &SessionRecord) -> bool {
        let limit = self.settings.max_login_attempts;
        limit > 0 && session.failed_pin_attempts >= limit
    }

    /// Count a failed credential check. Returns true once the session is locked.
    pub(super) async fn record_failed_attempt(&self, session: &mut SessionRecord, what: &str) -> Result<bool, EngineError> {
        session.failed_pin_attempts = session.failed_pin_attempts.saturating_add(1);
        self.save(session).await?;
        if !self.is_locked(session) {
            return Ok(false);
        }
        metrics::inc_lockouts();
        warn!(
            target: "security",
            "session locked after {} failed attempts (last: {}) session={} phone={}",
            session.failed_pin_attempts,
            what,
            session.session_id,
            mask_phone(&session.phone_number)
        );
        Ok(true)
    }
}
