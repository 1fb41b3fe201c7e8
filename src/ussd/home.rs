use super::engine::{UssdEngine, EVENT_OPTED_IN_TO_MARKETING, EVENT_OPTED_OUT_OF_MARKETING};
use super::menu;
use super::response::UssdResponse;
use super::session::SessionRecord;
use super::state::{DialogState, PinChangeStep};
use crate::crm::MarketingDecision;
use crate::error::EngineError;
use crate::metrics;

pub(super) const GO_BACK_INPUT: &str = "0";
const MARKETING_CHOICE: &str = "1";
const CHANGE_PIN_CHOICE: &str = "2";

impl UssdEngine {
    pub(super) async fn handle_home(&self, session: &mut SessionRecord, input: &str) -> Result<UssdResponse, EngineError> {
        let opted_out = self.crm.is_opted_out(&session.phone_number).await?;
        match input {
            "" | GO_BACK_INPUT => Ok(menu::home_menu(opted_out)),
            MARKETING_CHOICE => {
                let (decision, event) = if opted_out {
                    (MarketingDecision::OptIn, EVENT_OPTED_IN_TO_MARKETING)
                } else {
                    (MarketingDecision::OptOut, EVENT_OPTED_OUT_OF_MARKETING)
                };
                self.crm.opt_out_or_opt_in(&session.phone_number, decision).await?;
                self.record_event(session, event).await?;
                metrics::inc_marketing_toggles();
                Ok(menu::marketing_updated(decision == MarketingDecision::OptOut))
            }
            CHANGE_PIN_CHOICE => {
                self.move_to(session, DialogState::PinChange(PinChangeStep::CurrentPin)).await?;
                Ok(menu::current_pin_prompt())
            }
            _ => Ok(menu::invalid_home_choice(opted_out)),
        }
    }
}
