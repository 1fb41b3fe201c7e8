use log::{info, warn};

use super::engine::{UssdEngine, EVENT_RESET_PIN};
use super::menu;
use super::pin_change::Confirmation;
use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, PinResetStep};
use crate::error::EngineError;
use crate::logutil::mask_phone;
use crate::metrics;
use crate::storage::Profile;
use crate::validation::parse_date_of_birth;

impl UssdEngine {
    /// "Forgot PIN": the date of birth on file stands in for the old PIN.
    pub(super) async fn handle_pin_reset(
        &self,
        session: &mut SessionRecord,
        profile: &Profile,
        step: PinResetStep,
        input: &str,
    ) -> Result<UssdResponse, EngineError> {
        match step {
            PinResetStep::DateOfBirth => {
                if self.is_locked(session) {
                    return Ok(menu::login_locked());
                }
                if input.is_empty() {
                    return Ok(menu::date_of_birth_prompt());
                }
                let Ok(entered) = parse_date_of_birth(input) else {
                    return Ok(menu::invalid_date_of_birth());
                };
                if profile.date_of_birth != Some(entered) {
                    warn!(
                        target: "security",
                        "PIN reset date of birth mismatch session={} phone={}",
                        session.session_id,
                        mask_phone(&session.phone_number)
                    );
                    if self.record_failed_attempt(session, "wrong date of birth").await? {
                        return Ok(menu::login_locked());
                    }
                    return Ok(menu::wrong_date_of_birth());
                }
                self.move_to(session, DialogState::PinReset(PinResetStep::NewPin)).await?;
                Ok(menu::new_pin_prompt())
            }
            PinResetStep::NewPin => {
                self.accept_new_pin(session, input, DialogState::PinReset(PinResetStep::ConfirmPin))
                    .await
            }
            PinResetStep::ConfirmPin => match self.confirm_new_pin(session, profile, input).await? {
                Confirmation::Replaced => {
                    session.failed_pin_attempts = 0;
                    session.level = DialogState::Login.level();
                    self.save(session).await?;
                    self.record_event(session, EVENT_RESET_PIN).await?;
                    metrics::inc_pin_resets();
                    info!(
                        target: "security",
                        "PIN reset by subscriber session={} phone={}",
                        session.session_id,
                        mask_phone(&session.phone_number)
                    );
                    Ok(menu::pin_reset_complete())
                }
                Confirmation::Mismatch => Ok(menu::pin_mismatch()),
                Confirmation::NothingPending => {
                    self.move_to(session, DialogState::PinReset(PinResetStep::NewPin)).await?;
                    Ok(menu::new_pin_prompt())
                }
            },
        }
    }
}
