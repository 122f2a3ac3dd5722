//! The admission coordinator: per-party mutual exclusion and committed
//! writes.
//!
//! Two concurrent admission decisions on the same roster must never both
//! observe "capacity available" and both commit. The coordinator guarantees
//! this with two independent layers:
//!
//! 1. **In-process**: a per-party `tokio::sync::Mutex` linearizes every
//!    mutating operation against that party. Operations on different parties
//!    proceed independently; there is no global lock.
//! 2. **Cross-process**: every write goes through
//!    [`PartyStore::update`](party_planner_core::store::PartyStore::update)
//!    with the version observed at load time. If another process slipped a
//!    write in, the conflict triggers a bounded reload-and-redecide retry
//!    rather than a lost update.
//!
//! A caller that times out waiting for the lock has had no side effect
//! applied. Notifications for committed events are dispatched on spawned
//! tasks after the exclusive section releases; delivery failure is logged
//! and never rolls anything back.

use crate::config::CoordinatorConfig;
use crate::retry::RetryPolicy;
use party_planner_core::environment::{Notification, NotificationSink};
use party_planner_core::error::AdmissionError;
use party_planner_core::store::{PartyStore, StoreError};
use party_planner_core::types::{PartyEvent, PartyId, PartyRecord, Version};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serializes mutating operations per party and commits them with optimistic
/// concurrency.
pub struct AdmissionCoordinator {
    store: Arc<dyn PartyStore>,
    sink: Arc<dyn NotificationSink>,
    locks: Mutex<HashMap<PartyId, Arc<tokio::sync::Mutex<()>>>>,
    lock_timeout: Duration,
    retry: RetryPolicy,
}

impl AdmissionCoordinator {
    /// Create a coordinator with default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn PartyStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_config(store, sink, &CoordinatorConfig::default())
    }

    /// Create a coordinator with explicit configuration.
    #[must_use]
    pub fn with_config(
        store: Arc<dyn PartyStore>,
        sink: Arc<dyn NotificationSink>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            sink,
            locks: Mutex::new(HashMap::new()),
            lock_timeout: config.lock_timeout,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                initial_delay: config.retry_initial_delay,
                max_delay: config.retry_max_delay,
                ..RetryPolicy::default()
            },
        }
    }

    /// Shared handle to the underlying store, for read-only views.
    #[must_use]
    pub fn store(&self) -> Arc<dyn PartyStore> {
        Arc::clone(&self.store)
    }

    /// Run `decide` with exclusive access to the party's record and commit
    /// the result.
    ///
    /// `decide` is a pure decision function: it may be invoked more than once
    /// when a version conflict forces a reload, so it must not carry side
    /// effects of its own. On success the returned events are dispatched to
    /// the notification sink fire-and-forget.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unavailable`] if the lock wait exceeds the
    ///   configured timeout (no side effects have occurred) or the store
    ///   faults transiently.
    /// - [`AdmissionError::NotFound`] if the party does not exist.
    /// - [`AdmissionError::StaleVersion`] once conflict retries are
    ///   exhausted.
    /// - Any domain error returned by `decide`, unchanged.
    #[tracing::instrument(name = "with_party", skip_all, fields(%party_id, operation = operation))]
    pub async fn with_party<T, F>(
        &self,
        party_id: PartyId,
        operation: &'static str,
        mut decide: F,
    ) -> Result<T, AdmissionError>
    where
        F: FnMut(&mut PartyRecord) -> Result<(T, SmallVec<[PartyEvent; 2]>), AdmissionError>,
    {
        let lock = self.party_lock(party_id);
        let _guard = tokio::time::timeout(self.lock_timeout, lock.lock())
            .await
            .map_err(|_| {
                metrics::counter!("admission.lock_timeouts").increment(1);
                AdmissionError::Unavailable("timed out waiting for party exclusivity".to_string())
            })?;

        let mut attempt = 0;
        loop {
            let (mut record, version) = self
                .store
                .load(party_id)
                .await
                .map_err(map_store_error)?
                .ok_or(AdmissionError::NotFound)?;

            let (value, events) = decide(&mut record)?;

            match self.store.update(version, record).await {
                Ok(_) => {
                    metrics::counter!("admission.commits", "operation" => operation).increment(1);
                    self.dispatch(party_id, events);
                    return Ok(value);
                }
                Err(StoreError::VersionConflict { expected, actual, .. })
                    if self.retry.should_retry(attempt) =>
                {
                    metrics::counter!("admission.conflict_retries").increment(1);
                    tracing::warn!(
                        %party_id,
                        %expected,
                        %actual,
                        attempt,
                        "version conflict, reloading record"
                    );
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(StoreError::VersionConflict { .. }) => {
                    metrics::counter!("admission.stale_versions").increment(1);
                    tracing::error!(%party_id, attempt, "conflict retries exhausted");
                    return Err(AdmissionError::StaleVersion);
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }
    }

    /// Insert a brand-new record and dispatch its creation events.
    ///
    /// New records need no exclusivity: nobody can race on an identity that
    /// has not been handed out yet.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unavailable`] on transient store faults.
    pub async fn create(
        &self,
        record: PartyRecord,
        events: SmallVec<[PartyEvent; 2]>,
    ) -> Result<Version, AdmissionError> {
        let party_id = record.party.id;
        let version = self.store.insert(record).await.map_err(map_store_error)?;
        metrics::counter!("admission.commits", "operation" => "create_party").increment(1);
        self.dispatch(party_id, events);
        Ok(version)
    }

    /// Load a record without taking the party lock. Read-only views tolerate
    /// slightly stale data.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotFound`] if the party does not exist.
    /// - [`AdmissionError::Unavailable`] on transient store faults.
    pub async fn read(&self, party_id: PartyId) -> Result<PartyRecord, AdmissionError> {
        self.store
            .load(party_id)
            .await
            .map_err(map_store_error)?
            .map(|(record, _)| record)
            .ok_or(AdmissionError::NotFound)
    }

    fn party_lock(&self, party_id: PartyId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(party_id).or_default())
    }

    fn dispatch(&self, party_id: PartyId, events: SmallVec<[PartyEvent; 2]>) {
        for event in events {
            let notification = Notification::from_event(party_id, &event);
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Err(err) = sink.deliver(notification).await {
                    metrics::counter!("admission.notification_failures").increment(1);
                    tracing::warn!(%party_id, error = %err, "notification delivery failed");
                }
            });
        }
    }
}

fn map_store_error(err: StoreError) -> AdmissionError {
    match err {
        StoreError::VersionConflict { .. } => AdmissionError::StaleVersion,
        StoreError::NotFound(_) => AdmissionError::NotFound,
        StoreError::Unavailable(message) => AdmissionError::Unavailable(message),
    }
}
