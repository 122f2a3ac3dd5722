//! Dependency seams injected into the engine.
//!
//! All external capabilities the engine needs — time, invite code entropy,
//! and notification delivery — are abstracted behind traits so production
//! and test environments can swap them freely.

use crate::types::{PartyEvent, PartyId};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

// ============================================================================
// Clock
// ============================================================================

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Invite code entropy
// ============================================================================

/// Source of opaque invite code tokens.
pub trait CodeIssuer: Send + Sync {
    /// Generate a fresh token. Uniqueness across parties is not required —
    /// a code only resolves together with its party's current generation —
    /// but tokens must be unguessable.
    fn generate(&self) -> String;
}

/// Token alphabet without the ambiguous `0/O/1/I/L` glyphs.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Production issuer drawing uniformly from [`CODE_ALPHABET`].
#[derive(Debug, Clone, Copy)]
pub struct RandomCodeIssuer {
    length: usize,
}

impl RandomCodeIssuer {
    /// Create an issuer producing tokens of the given length.
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomCodeIssuer {
    fn default() -> Self {
        Self::new(6)
    }
}

impl CodeIssuer for RandomCodeIssuer {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[idx])
            })
            .collect()
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// A committed-transition notification handed to the delivery collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Party the event belongs to.
    pub party_id: PartyId,
    /// Stable event type identifier, e.g. `"MemberAccepted.v1"`.
    pub event_type: String,
    /// Event payload as structured JSON.
    pub payload: serde_json::Value,
}

impl Notification {
    /// Build a notification from a domain event.
    ///
    /// Serialization of a [`PartyEvent`] cannot fail (all fields are plain
    /// data), so this is infallible; a hypothetical failure degrades to a
    /// null payload rather than blocking the commit path.
    #[must_use]
    pub fn from_event(party_id: PartyId, event: &PartyEvent) -> Self {
        Self {
            party_id,
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Error reported by a notification collaborator.
///
/// Delivery is fire-and-forget: a failure is logged by the dispatcher and
/// never rolls back the transition that produced the event.
#[derive(Error, Debug, Clone)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Boxed future returned by [`NotificationSink::deliver`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Notification delivery seam (email, webhook, in-game mail...).
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    fn deliver(&self, notification: Notification) -> NotifyFuture<'_>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{MemberId, UserId};

    #[test]
    fn random_codes_have_requested_length_and_alphabet() {
        let issuer = RandomCodeIssuer::new(6);
        for _ in 0..32 {
            let code = issuer.generate();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn notification_carries_event_type_and_payload() {
        let party_id = PartyId::new();
        let event = PartyEvent::MemberAccepted {
            member_id: MemberId::new(),
            applicant: UserId::from("alice"),
        };

        let notification = Notification::from_event(party_id, &event);
        assert_eq!(notification.event_type, "MemberAccepted.v1");
        assert!(notification.payload["MemberAccepted"]["applicant"].is_string());
    }
}
