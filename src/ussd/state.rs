//! Dialog positions and their persisted level encoding.
//!
//! The session record stores a plain integer; everything above the store works on
//! [`DialogState`]. Each state owns explicit levels and decoding is an exhaustive
//! match, so an unknown integer is an error instead of falling into a neighbouring
//! flow.

use std::fmt;

pub const LOGIN_LEVEL: i32 = 0;
pub const HOME_LEVEL: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationStep {
    /// Nothing collected yet; show the welcome and ask for a first name
    Welcome,
    FirstName,
    LastName,
    DateOfBirth,
    Pin,
    ConfirmPin,
}

impl RegistrationStep {
    /// Registration step for a phone number with no profile. Registration overrides
    /// every other state, so any level outside the registration band restarts it.
    pub fn from_level(level: i32) -> RegistrationStep {
        match DialogState::from_level(level) {
            Some(DialogState::Registration(step)) => step,
            _ => RegistrationStep::Welcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinResetStep {
    DateOfBirth,
    NewPin,
    ConfirmPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinChangeStep {
    CurrentPin,
    NewPin,
    ConfirmPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    Registration(RegistrationStep),
    Login,
    Home,
    PinReset(PinResetStep),
    PinChange(PinChangeStep),
}

impl DialogState {
    /// Decode a persisted level. Returns `None` for levels no state owns.
    ///
    /// Level 0 decodes to [`DialogState::Login`]; a phone number without a profile
    /// is routed to registration by the engine before this matters.
    pub fn from_level(level: i32) -> Option<DialogState> {
        use DialogState::*;
        Some(match level {
            LOGIN_LEVEL => Login,
            HOME_LEVEL => Home,
            10 => PinReset(PinResetStep::DateOfBirth),
            11 => PinReset(PinResetStep::NewPin),
            12 => PinReset(PinResetStep::ConfirmPin),
            30 => Registration(RegistrationStep::FirstName),
            31 => Registration(RegistrationStep::LastName),
            32 => Registration(RegistrationStep::DateOfBirth),
            33 => Registration(RegistrationStep::Pin),
            34 => Registration(RegistrationStep::ConfirmPin),
            50 => PinChange(PinChangeStep::CurrentPin),
            51 => PinChange(PinChangeStep::NewPin),
            52 => PinChange(PinChangeStep::ConfirmPin),
            _ => return None,
        })
    }

    pub fn level(self) -> i32 {
        use DialogState::*;
        match self {
            Registration(RegistrationStep::Welcome) => LOGIN_LEVEL,
            Registration(RegistrationStep::FirstName) => 30,
            Registration(RegistrationStep::LastName) => 31,
            Registration(RegistrationStep::DateOfBirth) => 32,
            Registration(RegistrationStep::Pin) => 33,
            Registration(RegistrationStep::ConfirmPin) => 34,
            Login => LOGIN_LEVEL,
            Home => HOME_LEVEL,
            PinReset(PinResetStep::DateOfBirth) => 10,
            PinReset(PinResetStep::NewPin) => 11,
            PinReset(PinResetStep::ConfirmPin) => 12,
            PinChange(PinChangeStep::CurrentPin) => 50,
            PinChange(PinChangeStep::NewPin) => 51,
            PinChange(PinChangeStep::ConfirmPin) => 52,
        }
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogState::Registration(step) => write!(f, "registration/{:?}", step),
            DialogState::Login => f.write_str("login"),
            DialogState::Home => f.write_str("home"),
            DialogState::PinReset(step) => write!(f, "pin-reset/{:?}", step),
            DialogState::PinChange(step) => write!(f, "pin-change/{:?}", step),
        }
    }
}
