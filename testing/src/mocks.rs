//! Mock implementations of the engine's environment seams.

use chrono::{DateTime, Utc};
use party_planner_core::environment::{
    Clock, CodeIssuer, Notification, NotificationSink, NotifyError, NotifyFuture,
};
use party_planner_core::store::{PartyStore, StoreError, StoreFuture};
use party_planner_core::types::{PartyId, PartyRecord, Version};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// ============================================================================
// Clock
// ============================================================================

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making timestamps reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which should never
/// happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

// ============================================================================
// Party store
// ============================================================================

/// In-memory [`PartyStore`] with real optimistic-concurrency semantics.
///
/// `update` checks the expected version against the stored one and fails with
/// [`StoreError::VersionConflict`] on mismatch, exactly like a production
/// store would. Tests can additionally inject failures:
///
/// - [`inject_conflicts`](Self::inject_conflicts) forces the next N updates
///   to conflict, exercising the coordinator's retry loop
/// - [`set_unavailable`](Self::set_unavailable) makes every operation fail
///   transiently, exercising the distinct `Unavailable` error path
#[derive(Debug, Default)]
pub struct InMemoryPartyStore {
    records: Mutex<HashMap<PartyId, (PartyRecord, Version)>>,
    forced_conflicts: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryPartyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next `count` calls to `update` to fail with a version
    /// conflict without touching the stored record.
    pub fn inject_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Toggle transient unavailability for every operation.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current version of a stored record, if present.
    #[must_use]
    pub fn version_of(&self, party_id: PartyId) -> Option<Version> {
        self.lock().get(&party_id).map(|(_, version)| *version)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PartyId, (PartyRecord, Version)>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "injected store outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl PartyStore for InMemoryPartyStore {
    fn insert(&self, record: PartyRecord) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            self.check_available()?;
            let version = Version::initial();
            self.lock().insert(record.party.id, (record, version));
            Ok(version)
        })
    }

    fn load(&self, party_id: PartyId) -> StoreFuture<'_, Option<(PartyRecord, Version)>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.lock().get(&party_id).cloned())
        })
    }

    fn update(&self, expected: Version, record: PartyRecord) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            self.check_available()?;

            let party_id = record.party.id;
            if self
                .forced_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::VersionConflict {
                    party_id,
                    expected,
                    actual: expected.next(),
                });
            }

            let mut records = self.lock();
            let Some((stored, version)) = records.get_mut(&party_id) else {
                return Err(StoreError::NotFound(party_id));
            };
            if *version != expected {
                return Err(StoreError::VersionConflict {
                    party_id,
                    expected,
                    actual: *version,
                });
            }
            *stored = record;
            *version = version.next();
            Ok(*version)
        })
    }

    fn find_by_code(&self, code: String) -> StoreFuture<'_, Option<PartyId>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self
                .lock()
                .values()
                .find(|(record, _)| {
                    record
                        .party
                        .invite_code
                        .as_ref()
                        .is_some_and(|c| c.matches(&code))
                })
                .map(|(record, _)| record.party.id))
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<PartyRecord>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.lock().values().map(|(record, _)| record.clone()).collect())
        })
    }
}

// ============================================================================
// Invite codes
// ============================================================================

/// Scripted [`CodeIssuer`]: returns queued codes in order, then falls back to
/// a numbered sequence.
#[derive(Debug, Default)]
pub struct SequenceCodeIssuer {
    queued: Mutex<VecDeque<String>>,
    counter: AtomicUsize,
}

impl SequenceCodeIssuer {
    /// Create an issuer that yields the given codes first.
    #[must_use]
    pub fn new(codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            queued: Mutex::new(codes.into_iter().map(Into::into).collect()),
            counter: AtomicUsize::new(0),
        }
    }
}

impl CodeIssuer for SequenceCodeIssuer {
    fn generate(&self) -> String {
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        queued.unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("GEN{n:04}")
        })
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// [`NotificationSink`] that records every delivered notification.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// How many notifications of the given event type were delivered.
    #[must_use]
    pub fn count_of(&self, event_type: &str) -> usize {
        self.delivered()
            .iter()
            .filter(|n| n.event_type == event_type)
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move {
            self.delivered
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(notification);
            Ok(())
        })
    }
}

/// [`NotificationSink`] whose every delivery fails, for verifying that
/// notification faults never roll back a committed transition.
#[derive(Debug, Default)]
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn deliver(&self, _notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move { Err(NotifyError("injected delivery failure".to_string())) })
    }
}
