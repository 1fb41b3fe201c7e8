use super::engine::{UssdEngine, EVENT_CHANGED_PIN};
use super::home::GO_BACK_INPUT;
use super::menu;
use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, PinChangeStep};
use crate::error::EngineError;
use crate::metrics;
use crate::pin::PinVerification;
use crate::storage::Profile;
use crate::validation::validate_pin_format;

/// Outcome of the confirmation step shared by the change and reset flows.
pub(super) enum Confirmation {
    /// Confirmed and stored. The pending PIN is already cleared on the session
    /// record but not yet persisted.
    Replaced,
    Mismatch,
    /// No PIN is waiting for confirmation
    NothingPending,
}

impl UssdEngine {
    pub(super) async fn handle_pin_change(
        &self,
        session: &mut SessionRecord,
        profile: &Profile,
        step: PinChangeStep,
        input: &str,
    ) -> Result<UssdResponse, EngineError> {
        match step {
            PinChangeStep::CurrentPin => {
                if input == GO_BACK_INPUT {
                    let opted_out = self.crm.is_opted_out(&session.phone_number).await?;
                    self.move_to(session, DialogState::Home).await?;
                    return Ok(menu::home_menu(opted_out));
                }
                if input.is_empty() {
                    return Ok(menu::current_pin_prompt());
                }
                match self.pins.verify(&profile.id, input).await? {
                    PinVerification::Valid { .. } => {
                        self.move_to(session, DialogState::PinChange(PinChangeStep::NewPin)).await?;
                        Ok(menu::new_pin_prompt())
                    }
                    PinVerification::Invalid => Ok(menu::wrong_current_pin()),
                    PinVerification::Missing => Err(EngineError::MissingPin {
                        profile_id: profile.id.clone(),
                    }),
                }
            }
            PinChangeStep::NewPin => {
                self.accept_new_pin(session, input, DialogState::PinChange(PinChangeStep::ConfirmPin))
                    .await
            }
            PinChangeStep::ConfirmPin => match self.confirm_new_pin(session, profile, input).await? {
                Confirmation::Replaced => {
                    session.level = DialogState::Home.level();
                    self.save(session).await?;
                    self.record_event(session, EVENT_CHANGED_PIN).await?;
                    metrics::inc_pin_changes();
                    Ok(menu::pin_changed())
                }
                Confirmation::Mismatch => Ok(menu::pin_mismatch()),
                Confirmation::NothingPending => {
                    self.move_to(session, DialogState::PinChange(PinChangeStep::NewPin)).await?;
                    Ok(menu::new_pin_prompt())
                }
            },
        }
    }

    /// New-PIN step: validate the format, hold the PIN on the session and move on
    /// to `confirm_state`.
    pub(super) async fn accept_new_pin(
        &self,
        session: &mut SessionRecord,
        input: &str,
        confirm_state: DialogState,
    ) -> Result<UssdResponse, EngineError> {
        if input.is_empty() {
            return Ok(menu::new_pin_prompt());
        }
        if let Err(e) = validate_pin_format(input) {
            return Ok(menu::invalid_pin_format(&e));
        }
        self.remember_pin(session, input).await?;
        self.move_to(session, confirm_state).await?;
        Ok(menu::confirm_pin_prompt())
    }

    /// Confirmation step: on a match the profile's credential is replaced with a
    /// permanent PIN.
    pub(super) async fn confirm_new_pin(
        &self,
        session: &mut SessionRecord,
        profile: &Profile,
        input: &str,
    ) -> Result<Confirmation, EngineError> {
        if session.pin.is_empty() {
            return Ok(Confirmation::NothingPending);
        }
        if input != session.pin {
            return Ok(Confirmation::Mismatch);
        }
        self.pins.replace_pin(&profile.id, input).await?;
        session.clear_pending_pin();
        Ok(Confirmation::Replaced)
    }
}
