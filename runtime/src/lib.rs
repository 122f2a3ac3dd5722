//! # Party Planner Runtime
//!
//! The imperative shell around the party admission engine.
//!
//! The core crate decides; this crate coordinates. It provides:
//!
//! - [`AdmissionCoordinator`] — per-party mutual exclusion plus
//!   optimistic-concurrency commits, so racing admission requests on the
//!   same roster linearize and the capacity invariant holds even across
//!   process instances
//! - [`PartyService`] — the operation surface the transport layer calls:
//!   `create_party`, `apply`, `join_by_code`, `set_member_state`,
//!   `reissue_invite_code`, slot and preset management, and read-only views
//! - [`retry::RetryPolicy`] — bounded backoff for version conflicts
//! - [`CoordinatorConfig`] — env-driven runtime knobs
//!
//! ## Example
//!
//! ```ignore
//! use party_planner_runtime::PartyService;
//! use std::sync::Arc;
//!
//! let service = PartyService::new(store, notification_sink);
//!
//! let party = service.create_party(CreatePartyRequest { /* ... */ }).await?;
//! let member = service.apply(party.party.id, ApplyRequest { /* ... */ }).await?;
//! service
//!     .set_member_state(
//!         party.party.id,
//!         member.id,
//!         TransitionRequest::to(MemberState::Accepted),
//!         &host,
//!     )
//!     .await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod retry;
pub mod service;

pub use config::CoordinatorConfig;
pub use coordinator::AdmissionCoordinator;
pub use service::{
    ApplyRequest, CreatePartyRequest, JoinResponse, PartyFilter, PartyService,
};
