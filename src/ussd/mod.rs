//! # USSD Dialog Module
//!
//! Everything between a gateway callback and the `CON`/`END` text it answers with.
//!
//! ## Flow overview
//!
//! ```text
//! unknown phone ──► registration (0, 30-34) ──► END thank you
//!
//! known phone ──► login (0) ──► home (5) ──► change PIN (50-52) ──► home
//!                   │  00                         │ 1
//!                   ▼                             ▼
//!              reset PIN (10-12) ──► login    marketing opt-out toggle
//! ```
//!
//! A valid temporary (OTP) PIN at login jumps straight to the new-PIN step of the
//! change flow.
//!
//! ## Components
//!
//! - [`engine::UssdEngine`] - per-callback dispatch, persistence, failure policy
//! - [`state::DialogState`] - typed dialog position and its level encoding
//! - [`session::SessionRecord`] - the persisted per-dialog record
//! - [`menu`] / [`response`] - prompt texts and wire rendering
//! - `login`, `home`, `registration`, `pin_change`, `pin_reset` - flow handlers

pub mod engine;
pub mod menu;
pub mod response;
pub mod session;
pub mod state;

mod home;
mod login;
mod pin_change;
mod pin_reset;
mod registration;

pub use engine::{Collaborators, UssdEngine};
pub use response::{ResponseKind, UssdResponse};
pub use session::SessionRecord;
pub use state::DialogState;

/// One gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UssdRequest {
    pub session_id: String,
    /// As sent by the gateway, normalized by the engine
    pub phone_number: String,
    /// Cumulative input of the dialog, segments joined with `*`
    pub text: String,
}

impl UssdRequest {
    pub fn new(session_id: impl Into<String>, phone_number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            phone_number: phone_number.into(),
            text: text.into(),
        }
    }
}

/// The input typed since the previous callback: the last `*`-separated segment.
pub fn extract_latest_input(text: &str) -> &str {
    text.rsplit('*').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_input_is_last_segment() {
        assert_eq!(extract_latest_input(""), "");
        assert_eq!(extract_latest_input("1234"), "1234");
        assert_eq!(extract_latest_input("1234*2*5678"), "5678");
        assert_eq!(extract_latest_input("1234*2*"), "");
        assert_eq!(extract_latest_input("Jane*Doe "), "Doe");
    }
}
