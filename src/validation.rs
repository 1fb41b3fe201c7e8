//! Input validation for USSD keystrokes: PINs, phone numbers, dates of birth and names.
//!
//! Everything here is pure. A failed check is a corrective re-prompt for the
//! subscriber, never an engine failure, so callers match on the error and render text.

use chrono::{Datelike, NaiveDate, Utc};

/// PIN format violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinFormatError {
    #[error("PIN must contain only digits")]
    NonDigit,

    #[error("PIN must be 4, 5 or 6 digits long (got {len})")]
    Length { len: usize },
}

/// Phone number normalization failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,

    #[error("Phone number contains invalid characters: {0}")]
    InvalidCharacters(String),

    #[error("Phone number has an unexpected length ({digits} digits)")]
    InvalidLength { digits: usize },
}

/// Date of birth parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateOfBirthError {
    #[error("Date of birth must be 8 digits in DDMMYYYY format")]
    Format,

    #[error("Date of birth is not a calendar date")]
    InvalidDate,

    #[error("Date of birth cannot be in the future")]
    InFuture,
}

/// Person name validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name is too short (minimum 2 characters)")]
    TooShort,

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

pub const PIN_MIN_LENGTH: usize = 4;
pub const PIN_MAX_LENGTH: usize = 6;
const NAME_MAX_LENGTH: usize = 30;

/// Check that a candidate PIN is 4-6 ASCII digits.
pub fn validate_pin_format(pin: &str) -> Result<(), PinFormatError> {
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PinFormatError::NonDigit);
    }
    let len = pin.len();
    if !(PIN_MIN_LENGTH..=PIN_MAX_LENGTH).contains(&len) {
        return Err(PinFormatError::Length { len });
    }
    Ok(())
}

/// Normalize a gateway-formatted MSISDN into E.164 (`+<country><subscriber>`).
///
/// Accepted shapes, with `default_country_code = "254"`:
/// - `+254712345678`, `254712345678`
/// - `0712345678` (trunk prefix replaced by the default country code)
/// - `712345678` (bare subscriber number)
///
/// Spaces and dashes are ignored. Anything else is rejected.
pub fn normalize_phone_number(raw: &str, default_country_code: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let (has_plus, rest) = match trimmed.strip_prefix('+') {
        Some(r) => (true, r),
        None => (false, trimmed),
    };

    let bad: String = rest
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != ' ' && *c != '-')
        .collect();
    if !bad.is_empty() {
        return Err(PhoneError::InvalidCharacters(bad));
    }
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(PhoneError::Empty);
    }

    let international = if has_plus || (digits.starts_with(default_country_code) && digits.len() > 10) {
        digits
    } else if let Some(local) = digits.strip_prefix('0') {
        format!("{}{}", default_country_code, local)
    } else if digits.len() == 9 {
        format!("{}{}", default_country_code, digits)
    } else {
        digits
    };

    // E.164 caps the full number at 15 digits; anything under 10 is not a mobile number.
    if !(10..=15).contains(&international.len()) {
        return Err(PhoneError::InvalidLength { digits: international.len() });
    }
    Ok(format!("+{}", international))
}

/// Parse a `DDMMYYYY` date of birth (e.g. `14031996` for 14th March 1996).
pub fn parse_date_of_birth(input: &str) -> Result<NaiveDate, DateOfBirthError> {
    let input = input.trim();
    if input.len() != 8 || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(DateOfBirthError::Format);
    }
    let date = NaiveDate::parse_from_str(input, "%d%m%Y").map_err(|_| DateOfBirthError::InvalidDate)?;
    let today = Utc::now().date_naive();
    if date > today {
        return Err(DateOfBirthError::InFuture);
    }
    if date.year() < 1900 {
        return Err(DateOfBirthError::InvalidDate);
    }
    Ok(date)
}

/// Validate a first or last name typed on a handset keypad.
///
/// Letters (any script), single inner spaces, hyphens and apostrophes are allowed.
/// Returns the trimmed name.
pub fn validate_person_name(name: &str) -> Result<String, NameError> {
    let name = name.trim();
    let count = name.chars().count();
    if count < 2 {
        return Err(NameError::TooShort);
    }
    if count > NAME_MAX_LENGTH {
        return Err(NameError::TooLong { max: NAME_MAX_LENGTH });
    }
    let invalid: String = name
        .chars()
        .filter(|c| !(c.is_alphabetic() || *c == ' ' || *c == '-' || *c == '\''))
        .collect();
    if !invalid.is_empty() {
        return Err(NameError::InvalidCharacters { chars: invalid });
    }
    Ok(name.to_string())
}

/// Generate a safe filename from an opaque key (session id, phone number) using URL encoding
pub fn safe_filename(key: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(key, NON_ALPHANUMERIC).to_string()
}
