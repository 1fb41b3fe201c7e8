//! Engine failure taxonomy.
//!
//! Input problems and credential mismatches never become errors; flows answer them
//! with a corrective `CON` prompt. What remains is either an inconsistent dialog
//! state or a failing collaborator. Both end the dialog with one generic message,
//! but the structured value is logged first.

use crate::crm::CrmError;
use crate::pin::PinError;
use crate::storage::StoreError;
use crate::validation::PhoneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Unknown session on update, undecodable level, concurrent modification,
    /// missing credential for a known profile, unusable phone number
    StateInconsistency,
    /// Store, CRM, entropy or worker failure
    Collaborator,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::StateInconsistency => "state",
            FailureKind::Collaborator => "collaborator",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("phone number could not be normalized: {0}")]
    InvalidPhoneNumber(#[from] PhoneError),

    #[error("session {session_id} is at unrecognized level {level}")]
    UnrecognizedLevel { session_id: String, level: i32 },

    #[error("session {session_id} belongs to a different phone number")]
    SessionPhoneMismatch { session_id: String },

    #[error("profile {profile_id} has no PIN record")]
    MissingPin { profile_id: String },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("credential failure: {0}")]
    Credential(#[from] PinError),

    #[error("CRM failure: {0}")]
    Crm(#[from] CrmError),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::InvalidPhoneNumber(_)
            | EngineError::UnrecognizedLevel { .. }
            | EngineError::SessionPhoneMismatch { .. }
            | EngineError::MissingPin { .. } => FailureKind::StateInconsistency,
            EngineError::Store(StoreError::NotFound { .. } | StoreError::Conflict { .. })
            | EngineError::Credential(PinError::Store(StoreError::NotFound { .. })) => FailureKind::StateInconsistency,
            EngineError::Store(_) | EngineError::Credential(_) | EngineError::Crm(_) => FailureKind::Collaborator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let e = EngineError::UnrecognizedLevel { session_id: "s".into(), level: 77 };
        assert_eq!(e.kind(), FailureKind::StateInconsistency);
        assert_eq!(e.to_string(), "session s is at unrecognized level 77");

        let e = EngineError::SessionPhoneMismatch { session_id: "s".into() };
        assert_eq!(e.kind(), FailureKind::StateInconsistency);

        let e: EngineError = StoreError::Conflict { session_id: "s".into(), expected: 1, found: 2 }.into();
        assert_eq!(e.kind(), FailureKind::StateInconsistency);

        let e: EngineError = StoreError::Io(std::io::Error::other("disk")).into();
        assert_eq!(e.kind(), FailureKind::Collaborator);

        let e: EngineError = CrmError::Timeout(5).into();
        assert_eq!(e.kind(), FailureKind::Collaborator);
        assert_eq!(e.kind().as_str(), "collaborator");
    }
}
