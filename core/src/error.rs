//! Error taxonomy for admission operations.
//!
//! Every error here is recoverable by the caller and returned synchronously
//! from the operation that detected it; none leaves partial state behind.
//! Transient infrastructure faults are kept distinct from domain rejections
//! so that, for example, a storage timeout is never reported as
//! [`AdmissionError::CapacityExceeded`].

use crate::types::MemberState;
use thiserror::Error;

/// Structured rejection of a submitted gear preset.
///
/// The `reason` is a stable machine-readable tag such as `"ip_below_minimum"`
/// or `"unknown_weapon_line"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("preset validation failed: {reason}")]
pub struct ValidationError {
    /// Machine-readable failure tag.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error with the given reason tag.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors returned by admission and membership-state operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The applicant already holds an open record for this party.
    /// Re-application requires an explicit withdraw first.
    #[error("applicant already has an open application for this party")]
    DuplicateApplication,

    /// The requested edge does not exist in the membership state graph.
    #[error("illegal membership transition: {from} -> {to}")]
    InvalidTransition {
        /// State the member is currently in.
        from: MemberState,
        /// State the caller asked for.
        to: MemberState,
    },

    /// Confirming this member would exceed the party's declared capacity.
    /// The member remains in its prior state.
    #[error("party capacity of {capacity} is exhausted")]
    CapacityExceeded {
        /// The party's declared capacity.
        capacity: u32,
    },

    /// The presented invite code does not resolve. Stale, foreign, and
    /// malformed codes fail identically so callers cannot distinguish them.
    #[error("invite code is not valid")]
    CodeInvalid,

    /// The slot's requirements are frozen because a confirmed member
    /// references it.
    #[error("slot requirements are locked by a confirmed member")]
    SlotLocked,

    /// A submitted gear preset failed validation against the slot's
    /// requirements.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record changed underneath the operation and retries were
    /// exhausted.
    #[error("party record was modified concurrently; retries exhausted")]
    StaleVersion,

    /// The actor lacks the privilege (usually: being the host) for the
    /// requested operation.
    #[error("actor is not authorized for this operation")]
    NotAuthorized,

    /// The party, member, or slot does not exist.
    #[error("requested entity was not found")]
    NotFound,

    /// Transient infrastructure fault (storage, lock wait). Retryable by the
    /// caller; never conflated with a domain rejection.
    #[error("operation unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_reason() {
        let err = ValidationError::new("ip_below_minimum");
        assert_eq!(err.reason, "ip_below_minimum");
        assert_eq!(
            err.to_string(),
            "preset validation failed: ip_below_minimum"
        );
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = AdmissionError::InvalidTransition {
            from: MemberState::Locked,
            to: MemberState::Accepted,
        };
        assert_eq!(
            err.to_string(),
            "illegal membership transition: locked -> accepted"
        );
    }

    #[test]
    fn validation_converts_into_admission_error() {
        let err: AdmissionError = ValidationError::new("missing_offhand").into();
        assert!(matches!(err, AdmissionError::Validation(_)));
    }
}
