//! # PIN Credentials
//!
//! Salted PBKDF2 derivation and verification of subscriber PINs, plus generation of
//! temporary (OTP) PINs handed out by an administrator reset.
//!
//! The functions in this module are pure apart from drawing entropy from the OS.
//! [`PinService`] binds them to a [`crate::storage::PinStore`].
//!
//! ```rust
//! use bewell_ussd::pin::{derive_pin, verify_pin, PinOptions};
//!
//! let options = PinOptions { iterations: 1_000, key_len: 64, ..PinOptions::default() };
//! let derived = derive_pin("1234", &options).unwrap();
//! assert!(verify_pin("1234", &derived.salt, &derived.hash, &options));
//! assert!(!verify_pin("4321", &derived.salt, &derived.hash, &options));
//! ```

pub mod service;

pub use service::{PinService, PinVerification};

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

/// Alphabet salt bytes are folded onto.
const SALT_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of digits in a system-generated temporary PIN.
pub const TEMPORARY_PIN_LENGTH: usize = 4;

/// Errors raised by the credential primitives
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    #[error("invalid PIN derivation options: {0}")]
    InvalidOptions(String),

    #[error("PIN derivation worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Store(#[from] crate::storage::StoreError),
}

/// HMAC digest used inside PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    #[default]
    Sha512,
    Sha256,
}

/// Key-derivation parameters.
///
/// An immutable value handed to [`PinService`] at construction time. Changing any
/// field invalidates every stored hash derived with the previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinOptions {
    /// Salt length in characters
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Derived key length in bytes (hex output is twice as long)
    #[serde(default = "default_key_len")]
    pub key_len: usize,
    #[serde(default)]
    pub hash: HashFunction,
}

fn default_salt_len() -> usize {
    256
}

fn default_iterations() -> u32 {
    10_000
}

fn default_key_len() -> usize {
    512
}

impl Default for PinOptions {
    fn default() -> Self {
        PinOptions {
            salt_len: default_salt_len(),
            iterations: default_iterations(),
            key_len: default_key_len(),
            hash: HashFunction::default(),
        }
    }
}

impl PinOptions {
    pub fn validate(&self) -> Result<(), PinError> {
        if self.salt_len == 0 {
            return Err(PinError::InvalidOptions("salt_len must be greater than zero".into()));
        }
        if self.iterations == 0 {
            return Err(PinError::InvalidOptions("iterations must be greater than zero".into()));
        }
        if self.key_len == 0 {
            return Err(PinError::InvalidOptions("key_len must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Output of [`derive_pin`]: the generated salt and the hex-encoded derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPin {
    pub salt: String,
    pub hash: String,
}

/// A subscriber's current credential. At most one per profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: String,
    pub profile_id: String,
    /// Hex-encoded PBKDF2 output
    pub pin_number: String,
    pub salt: String,
    /// System-generated PIN that must be replaced before full access
    pub is_otp: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derive a salted hash for `raw_pin`.
pub fn derive_pin(raw_pin: &str, options: &PinOptions) -> Result<DerivedPin, PinError> {
    options.validate()?;
    let salt = generate_salt(options.salt_len)?;
    let hash = hash_with_salt(raw_pin, &salt, options);
    Ok(DerivedPin { salt, hash })
}

/// Recompute the derivation for `raw_pin` and compare it to `expected_hash`.
pub fn verify_pin(raw_pin: &str, salt: &str, expected_hash: &str, options: &PinOptions) -> bool {
    if options.validate().is_err() {
        return false;
    }
    let computed = hash_with_salt(raw_pin, salt, options);
    computed.as_bytes().ct_eq(expected_hash.as_bytes()).into()
}

/// Produce a 4-digit temporary PIN, one uniformly drawn digit at a time.
pub fn generate_temporary_pin() -> Result<String, PinError> {
    let mut rng = OsRng;
    let mut pin = String::with_capacity(TEMPORARY_PIN_LENGTH);
    let mut buf = [0u8; 8];
    while pin.len() < TEMPORARY_PIN_LENGTH {
        rng.try_fill_bytes(&mut buf)?;
        // 250 is the largest multiple of 10 below 256; rejecting above it keeps digits uniform.
        for b in buf.iter().filter(|b| **b < 250) {
            if pin.len() == TEMPORARY_PIN_LENGTH {
                break;
            }
            pin.push(char::from(b'0' + b % 10));
        }
    }
    Ok(pin)
}

fn generate_salt(len: usize) -> Result<String, PinError> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes
        .iter()
        .map(|b| SALT_ALPHABET[*b as usize % SALT_ALPHABET.len()] as char)
        .collect())
}

fn hash_with_salt(raw_pin: &str, salt: &str, options: &PinOptions) -> String {
    let mut key = vec![0u8; options.key_len];
    match options.hash {
        HashFunction::Sha512 => {
            pbkdf2::pbkdf2_hmac::<Sha512>(raw_pin.as_bytes(), salt.as_bytes(), options.iterations, &mut key)
        }
        HashFunction::Sha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(raw_pin.as_bytes(), salt.as_bytes(), options.iterations, &mut key)
        }
    }
    hex::encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> PinOptions {
        PinOptions { salt_len: 32, iterations: 10, key_len: 32, hash: HashFunction::Sha512 }
    }

    #[test]
    fn salt_is_alphanumeric_and_sized() {
        let derived = derive_pin("1234", &quick()).unwrap();
        assert_eq!(derived.salt.len(), 32);
        assert!(derived.salt.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(derived.hash.len(), 64);
    }

    #[test]
    fn same_pin_gets_fresh_salt() {
        let a = derive_pin("1234", &quick()).unwrap();
        let b = derive_pin("1234", &quick()).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn hash_function_changes_output() {
        let sha512 = quick();
        let sha256 = PinOptions { hash: HashFunction::Sha256, ..quick() };
        let derived = derive_pin("1234", &sha512).unwrap();
        assert!(verify_pin("1234", &derived.salt, &derived.hash, &sha512));
        assert!(!verify_pin("1234", &derived.salt, &derived.hash, &sha256));
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let derived = derive_pin("987654", &quick()).unwrap();
        let mut tampered = derived.hash.clone();
        tampered.replace_range(0..1, if tampered.starts_with('0') { "1" } else { "0" });
        assert!(!verify_pin("987654", &derived.salt, &tampered, &quick()));
        assert!(!verify_pin("987654", &derived.salt, "", &quick()));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let bad = PinOptions { iterations: 0, ..quick() };
        assert!(matches!(derive_pin("1234", &bad), Err(PinError::InvalidOptions(_))));
        let bad = PinOptions { salt_len: 0, ..quick() };
        assert!(derive_pin("1234", &bad).is_err());
        let bad = PinOptions { key_len: 0, ..quick() };
        assert!(derive_pin("1234", &bad).is_err());
    }

    #[test]
    fn temporary_pin_is_four_digits() {
        for _ in 0..200 {
            let pin = generate_temporary_pin().unwrap();
            assert_eq!(pin.len(), TEMPORARY_PIN_LENGTH);
            assert!(pin.chars().all(|c| c.is_ascii_digit()), "{pin}");
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: PinOptions = toml::from_str("hash = \"sha256\"").unwrap();
        assert_eq!(opts.hash, HashFunction::Sha256);
        assert_eq!(opts.salt_len, 256);
        assert_eq!(opts.iterations, 10_000);
        assert_eq!(opts.key_len, 512);
    }
}
