//! Prompt texts. Handsets render roughly 160 characters per screen, so every
//! prompt stays short and lines are broken explicitly.

use super::response::UssdResponse;
use crate::validation::PinFormatError;

pub const GO_BACK_HOME: &str = "0. Go back home";
const FORGOT_PIN: &str = "00. Forgot PIN?";

fn marketing_option(opted_out: bool) -> &'static str {
    if opted_out {
        "1. Opt in to marketing messages"
    } else {
        "1. Opt out of marketing messages"
    }
}

// Login

pub fn login_welcome(first_name: &str) -> UssdResponse {
    let greeting = format!("Welcome back to Be.Well, {}.", first_name);
    UssdResponse::con_lines(&[&greeting, "Please enter your PIN to continue", FORGOT_PIN])
}

pub fn wrong_login_pin() -> UssdResponse {
    UssdResponse::con_lines(&["The PIN you entered is not correct", "Please try again", FORGOT_PIN])
}

pub fn login_locked() -> UssdResponse {
    UssdResponse::end_lines(&[
        "You have entered a wrong PIN too many times.",
        "Dial again and choose 00 to reset your PIN",
    ])
}

// Home

pub fn home_menu(opted_out: bool) -> UssdResponse {
    UssdResponse::con_lines(&["Welcome to Be.Well", marketing_option(opted_out), "2. Change PIN"])
}

pub fn invalid_home_choice(opted_out: bool) -> UssdResponse {
    UssdResponse::con_lines(&["Invalid choice. Please try again.", marketing_option(opted_out), "2. Change PIN"])
}

pub fn marketing_updated(now_opted_out: bool) -> UssdResponse {
    let what = if now_opted_out { "out of marketing messages" } else { "in to marketing messages" };
    UssdResponse::con_lines(&["We have successfully opted you", what, GO_BACK_HOME])
}

// Date of birth

pub fn date_of_birth_prompt() -> UssdResponse {
    UssdResponse::con_lines(&[
        "Please enter your date of birth in",
        "DDMMYYYY format e.g 14031996 for",
        "14th March 1996",
    ])
}

pub fn invalid_date_of_birth() -> UssdResponse {
    UssdResponse::con_lines(&[
        "The date of birth you entered is not valid",
        "Please enter it in DDMMYYYY format e.g 14031996",
    ])
}

pub fn wrong_date_of_birth() -> UssdResponse {
    UssdResponse::con_lines(&["The date of birth you entered is not correct", "Please try again"])
}

// New PIN entry shared by registration, change and reset

pub fn new_pin_prompt() -> UssdResponse {
    UssdResponse::con("Please enter a new 4-6 digit PIN")
}

pub fn temporary_pin_must_change() -> UssdResponse {
    UssdResponse::con_lines(&["Your PIN is temporary.", "Please enter a new 4-6 digit PIN", "to secure your account"])
}

pub fn invalid_pin_format(err: &PinFormatError) -> UssdResponse {
    let reason = match err {
        PinFormatError::NonDigit => "Your PIN must contain only numbers",
        PinFormatError::Length { .. } => "Your PIN must be 4 to 6 digits long",
    };
    UssdResponse::con_lines(&[reason, "Please enter a new PIN"])
}

pub fn confirm_pin_prompt() -> UssdResponse {
    UssdResponse::con("Please enter the PIN again to confirm")
}

pub fn pin_mismatch() -> UssdResponse {
    UssdResponse::con_lines(&["The PINs you entered do not match", "Please enter the PIN again to confirm"])
}

// PIN change / reset

pub fn current_pin_prompt() -> UssdResponse {
    UssdResponse::con_lines(&["Please enter your current PIN", GO_BACK_HOME])
}

pub fn wrong_current_pin() -> UssdResponse {
    UssdResponse::con_lines(&["The PIN you entered is not correct", "Please enter your current PIN", GO_BACK_HOME])
}

pub fn pin_changed() -> UssdResponse {
    UssdResponse::con_lines(&["Your PIN was changed successfully", GO_BACK_HOME])
}

pub fn pin_reset_complete() -> UssdResponse {
    UssdResponse::con_lines(&["Your PIN was reset successfully", "Please enter your new PIN to continue"])
}

// Registration

pub fn registration_welcome() -> UssdResponse {
    UssdResponse::con_lines(&["Welcome to Be.Well", "Please enter your first name", "(e.g. John)"])
}

pub fn last_name_prompt() -> UssdResponse {
    UssdResponse::con_lines(&["Please enter your last name", "(e.g. Doe)"])
}

pub fn invalid_name() -> UssdResponse {
    UssdResponse::con_lines(&["The name you entered is not valid", "Please use letters only"])
}

pub fn registration_pin_prompt() -> UssdResponse {
    UssdResponse::con_lines(&["Please enter a 4-6 digit PIN", "to secure your account"])
}

pub fn registration_complete() -> UssdResponse {
    UssdResponse::end_lines(&["Thank you for signing up for Be.Well", "Dial again to log in"])
}
