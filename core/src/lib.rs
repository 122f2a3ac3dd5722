//! # Party Planner Core
//!
//! Domain engine for capacity-bounded party admission and membership state.
//!
//! A host organizes a *party* with a strict headcount, opens role-tagged
//! slots, and admits members through public application or private
//! invite-code entry. This crate is the decision core: for every
//! apply / join-by-code / approve / reject / kick / reissue-code request it
//! decides whether the request is legal given the current roster and applies
//! the resulting transition. It guarantees one invariant above all others:
//!
//! > For every party, at every observable instant,
//! > `count(members in {accepted, locked}) <= capacity`.
//!
//! ## Architecture
//!
//! Functional core, imperative shell. Everything here is synchronous and
//! pure with respect to shared state: functions take a [`types::PartyRecord`]
//! (the aggregate of a party, its slots, and its full membership history),
//! validate a request against it, mutate it in place, and return the domain
//! events the commit must publish. Serializing concurrent callers, persisting
//! records under optimistic version checks, and dispatching notifications are
//! the runtime crate's job.
//!
//! - [`ledger`] — the membership state machine and capacity check
//! - [`invite`] — invite code issue / resolve / rotate
//! - [`slots`] — the role slot catalog
//! - [`preset`] — gear preset payloads and the pure validator
//! - [`presets_library`] — saved preset catalog
//! - [`store`] — the versioned persistence seam ([`store::PartyStore`])
//! - [`environment`] — clock, code entropy, and notification seams
//! - [`error`] — the recoverable error taxonomy

pub mod environment;
pub mod error;
pub mod invite;
pub mod ledger;
pub mod preset;
pub mod presets_library;
pub mod slots;
pub mod store;
pub mod types;

pub use error::{AdmissionError, ValidationError};
pub use store::{PartyStore, StoreError};
pub use types::{
    Capacity, InviteCode, MemberId, MemberState, Party, PartyDetail, PartyEvent, PartyId,
    PartyMember, PartyRecord, PartySlot, PartyStatus, PartyVisibility, SlotId, UserId, Version,
};
