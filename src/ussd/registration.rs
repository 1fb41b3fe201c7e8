use log::info;

use super::engine::{UssdEngine, EVENT_COMPLETED_REGISTRATION};
use super::menu;
use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, RegistrationStep};
use crate::error::EngineError;
use crate::logutil::mask_phone;
use crate::metrics;
use crate::storage::NewProfile;
use crate::validation::{parse_date_of_birth, validate_person_name, validate_pin_format};

impl UssdEngine {
    /// Sign-up for a phone number without a profile. Draft fields live on the
    /// session record until the PIN is confirmed.
    pub(super) async fn handle_registration(
        &self,
        session: &mut SessionRecord,
        step: RegistrationStep,
        input: &str,
    ) -> Result<UssdResponse, EngineError> {
        use RegistrationStep::*;
        match step {
            Welcome => {
                self.move_to(session, DialogState::Registration(FirstName)).await?;
                Ok(menu::registration_welcome())
            }
            FirstName => match validate_person_name(input) {
                Ok(name) => {
                    session.first_name = Some(name);
                    session.level = DialogState::Registration(LastName).level();
                    self.save(session).await?;
                    Ok(menu::last_name_prompt())
                }
                Err(_) => Ok(menu::invalid_name()),
            },
            LastName => match validate_person_name(input) {
                Ok(name) => {
                    session.last_name = Some(name);
                    session.level = DialogState::Registration(DateOfBirth).level();
                    self.save(session).await?;
                    Ok(menu::date_of_birth_prompt())
                }
                Err(_) => Ok(menu::invalid_name()),
            },
            DateOfBirth => match parse_date_of_birth(input) {
                Ok(date) => {
                    session.date_of_birth = Some(date);
                    session.level = DialogState::Registration(Pin).level();
                    self.save(session).await?;
                    Ok(menu::registration_pin_prompt())
                }
                Err(_) => Ok(menu::invalid_date_of_birth()),
            },
            Pin => {
                if input.is_empty() {
                    return Ok(menu::registration_pin_prompt());
                }
                if let Err(e) = validate_pin_format(input) {
                    return Ok(menu::invalid_pin_format(&e));
                }
                self.remember_pin(session, input).await?;
                self.move_to(session, DialogState::Registration(ConfirmPin)).await?;
                Ok(menu::confirm_pin_prompt())
            }
            ConfirmPin => self.complete_registration(session, input).await,
        }
    }

    async fn complete_registration(&self, session: &mut SessionRecord, input: &str) -> Result<UssdResponse, EngineError> {
        if session.pin.is_empty() {
            self.move_to(session, DialogState::Registration(RegistrationStep::Pin)).await?;
            return Ok(menu::registration_pin_prompt());
        }
        if input != session.pin {
            return Ok(menu::pin_mismatch());
        }
        let (Some(first_name), Some(last_name), Some(date_of_birth)) =
            (session.first_name.clone(), session.last_name.clone(), session.date_of_birth)
        else {
            // Drafts lost; collect them again
            session.clear_pending_pin();
            session.level = DialogState::Registration(RegistrationStep::FirstName).level();
            self.save(session).await?;
            return Ok(menu::registration_welcome());
        };

        let profile = self
            .profiles
            .create_profile(NewProfile {
                phone_number: session.phone_number.clone(),
                first_name,
                last_name,
                date_of_birth: Some(date_of_birth),
            })
            .await?;
        self.pins.create_pin(&profile.id, input, false).await?;

        session.clear_pending_pin();
        session.level = DialogState::Login.level();
        self.save(session).await?;
        self.record_event(session, EVENT_COMPLETED_REGISTRATION).await?;
        metrics::inc_registrations();
        info!(
            "registered profile {} phone={}",
            profile.id,
            mask_phone(&profile.phone_number)
        );
        Ok(menu::registration_complete())
    }
}
