//! Credential lifecycle on top of a [`PinStore`]: signup, verification, replacement
//! after a change/reset flow, and administrator-issued temporary PINs.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

use super::{derive_pin, generate_temporary_pin, verify_pin, DerivedPin, PinError, PinOptions, PinRecord};
use crate::storage::PinStore;

/// Outcome of checking a raw PIN against a profile's stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerification {
    Valid { is_otp: bool },
    Invalid,
    /// The profile has no PIN record at all
    Missing,
}

#[derive(Clone)]
pub struct PinService {
    store: Arc<dyn PinStore>,
    options: Arc<PinOptions>,
}

impl PinService {
    pub fn new(store: Arc<dyn PinStore>, options: PinOptions) -> Result<Self, PinError> {
        options.validate()?;
        Ok(PinService { store, options: Arc::new(options) })
    }

    pub fn options(&self) -> &PinOptions {
        &self.options
    }

    /// Store a fresh credential for a profile, replacing any existing one.
    pub async fn create_pin(&self, profile_id: &str, raw_pin: &str, is_otp: bool) -> Result<PinRecord, PinError> {
        let derived = self.derive(raw_pin).await?;
        let existing = self.store.get_pin_by_profile(profile_id).await?;
        let now = Utc::now();
        let record = PinRecord {
            id: existing.as_ref().map(|r| r.id.clone()).unwrap_or_else(|| Uuid::new_v4().to_string()),
            profile_id: profile_id.to_string(),
            pin_number: derived.hash,
            salt: derived.salt,
            is_otp,
            created_at: existing.map(|r| r.created_at).unwrap_or(now),
            updated_at: now,
        };
        let saved = self.store.save_pin(record).await?;
        debug!("pin.saved profile={} otp={}", profile_id, is_otp);
        Ok(saved)
    }

    /// Replace the profile's PIN after a successful change or reset. Clears the OTP flag.
    pub async fn replace_pin(&self, profile_id: &str, raw_pin: &str) -> Result<PinRecord, PinError> {
        self.create_pin(profile_id, raw_pin, false).await
    }

    /// Administrator reset: issue a temporary PIN the subscriber must replace on next login.
    /// Returns the raw digits for out-of-band delivery alongside the stored record.
    pub async fn issue_temporary_pin(&self, profile_id: &str) -> Result<(String, PinRecord), PinError> {
        let raw = generate_temporary_pin()?;
        let record = self.create_pin(profile_id, &raw, true).await?;
        info!(target: "security", "pin.temporary_issued profile={}", profile_id);
        Ok((raw, record))
    }

    pub async fn verify(&self, profile_id: &str, raw_pin: &str) -> Result<PinVerification, PinError> {
        let Some(record) = self.store.get_pin_by_profile(profile_id).await? else {
            return Ok(PinVerification::Missing);
        };
        let options = Arc::clone(&self.options);
        let raw = raw_pin.to_string();
        let salt = record.salt.clone();
        let expected = record.pin_number.clone();
        let ok = tokio::task::spawn_blocking(move || verify_pin(&raw, &salt, &expected, &options))
            .await
            .map_err(|e| PinError::Worker(e.to_string()))?;
        Ok(if ok {
            PinVerification::Valid { is_otp: record.is_otp }
        } else {
            PinVerification::Invalid
        })
    }

    // PBKDF2 with default options is tens of milliseconds of CPU; keep it off the reactor.
    async fn derive(&self, raw_pin: &str) -> Result<DerivedPin, PinError> {
        let options = Arc::clone(&self.options);
        let raw = raw_pin.to_string();
        tokio::task::spawn_blocking(move || derive_pin(&raw, &options))
            .await
            .map_err(|e| PinError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::HashFunction;
    use crate::storage::memory::InMemoryStorage;

    fn service() -> PinService {
        let store = Arc::new(InMemoryStorage::new());
        let options = PinOptions { salt_len: 16, iterations: 5, key_len: 32, hash: HashFunction::Sha256 };
        PinService::new(store, options).unwrap()
    }

    #[test]
    fn verify_missing_profile() {
        let svc = service();
        let outcome = tokio_test::block_on(svc.verify("nobody", "1234")).unwrap();
        assert_eq!(outcome, PinVerification::Missing);
    }

    #[tokio::test]
    async fn replace_keeps_record_id_and_clears_otp() {
        let svc = service();
        let (raw, otp) = svc.issue_temporary_pin("p1").await.unwrap();
        assert!(otp.is_otp);
        assert_eq!(svc.verify("p1", &raw).await.unwrap(), PinVerification::Valid { is_otp: true });

        let replaced = svc.replace_pin("p1", "556677").await.unwrap();
        assert_eq!(replaced.id, otp.id);
        assert_eq!(replaced.created_at, otp.created_at);
        assert!(!replaced.is_otp);
        assert_eq!(svc.verify("p1", "556677").await.unwrap(), PinVerification::Valid { is_otp: false });
        assert_eq!(svc.verify("p1", &raw).await.unwrap(), PinVerification::Invalid);
    }

    #[test]
    fn rejects_invalid_options() {
        let store = Arc::new(InMemoryStorage::new());
        let options = PinOptions { iterations: 0, ..PinOptions::default() };
        assert!(PinService::new(store, options).is_err());
    }
}
