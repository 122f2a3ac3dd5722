//! Persistence seam: versioned, atomic get/put of party records.
//!
//! The engine does not own a storage implementation. It requires exactly
//! this contract from its persistence collaborator: atomic read-modify-write
//! keyed by party identity with an optimistic version token. Even when the
//! in-process per-party lock is bypassed (a second process instance), a
//! conflicting concurrent write must fail with
//! [`StoreError::VersionConflict`] so the coordinator can retry — a lost
//! update must never surface as a capacity bug.
//!
//! Membership records are append/mutate-only: an implementation must never
//! drop members from a record it persists.
//!
//! # Dyn Compatibility
//!
//! Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
//! the trait can be used as `Arc<dyn PartyStore>` across the coordinator and
//! test doubles.

use crate::types::{PartyId, PartyRecord, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors surfaced by the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the record moved past the expected
    /// version. The caller should reload and re-decide.
    #[error("version conflict on party {party_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Party whose record conflicted.
        party_id: PartyId,
        /// Version the writer expected.
        expected: Version,
        /// Version actually found.
        actual: Version,
    },

    /// No record exists for the party.
    #[error("party not found: {0}")]
    NotFound(PartyId),

    /// Transient backend fault (connection loss, timeout). Distinct from any
    /// domain rejection.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Versioned party record storage.
///
/// Implementations must be `Send + Sync`; the coordinator shares one store
/// across every in-flight request.
pub trait PartyStore: Send + Sync {
    /// Insert a new record, returning its initial version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] on backend faults.
    fn insert(&self, record: PartyRecord) -> StoreFuture<'_, Version>;

    /// Load a record and its current version. Absent parties yield
    /// `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] on backend faults.
    fn load(&self, party_id: PartyId) -> StoreFuture<'_, Option<(PartyRecord, Version)>>;

    /// Replace a record if and only if it is still at `expected`; returns the
    /// new version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::VersionConflict`] if the stored version differs from
    ///   `expected`.
    /// - [`StoreError::NotFound`] if the record vanished.
    /// - [`StoreError::Unavailable`] on backend faults.
    fn update(
        &self,
        expected: Version,
        record: PartyRecord,
    ) -> StoreFuture<'_, Version>;

    /// Find the party currently holding the presented invite code, if any.
    ///
    /// This is a hint for routing a `join_by_code` call to the right record;
    /// the coordinator re-validates the code inside the party's exclusive
    /// section, so a stale answer here is harmless.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] on backend faults.
    fn find_by_code(&self, code: String) -> StoreFuture<'_, Option<PartyId>>;

    /// Load every record. Read-model queries only; possibly stale.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] on backend faults.
    fn list(&self) -> StoreFuture<'_, Vec<PartyRecord>>;
}
