//! Domain types for the party admission engine.
//!
//! This module contains the value objects, entities, and aggregate record for
//! capacity-bounded parties: identifiers, the party itself, role slots,
//! membership records, and the domain events emitted by committed transitions.

use crate::preset::{GearPreset, SlotRequirements};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a party.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(Uuid);

impl PartyId {
    /// Creates a new random `PartyId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PartyId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PartyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a slot within a party.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(Uuid);

impl SlotId {
    /// Creates a new random `SlotId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a membership record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(Uuid);

impl MemberId {
    /// Creates a new random `MemberId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller identity as presented to the engine.
///
/// Identity verification beyond "caller presents a name" is an external
/// collaborator's concern, so this stays a plain string newtype.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new `UserId` from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for UserId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Declared roster ceiling for a party.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the capacity value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optimistic concurrency token for a stored party record.
///
/// Every committed mutation of a record advances its version by one; an
/// `update` that presents a stale version is rejected by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Create a version from a raw counter value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version assigned to a freshly inserted record.
    #[must_use]
    pub const fn initial() -> Self {
        Self(1)
    }

    /// The version following this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the raw counter value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a party is publicly listed or reachable only by invite code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyVisibility {
    /// Listed publicly; anyone may apply.
    Public,
    /// Hidden; entry requires the current invite code.
    Private,
}

/// Lifecycle status of a party.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    /// Accepting applications and code joins.
    Open,
    /// No longer admitting; roster retained.
    Closed,
    /// Called off by the host.
    Cancelled,
}

/// Membership state machine states.
///
/// Legal edges: `Applied → {Accepted, Rejected}`,
/// `Accepted → {Locked, Kicked, Rejected}`, `Locked → {Kicked}`.
/// `Rejected` and `Kicked` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberState {
    /// Application submitted, awaiting a host decision.
    Applied,
    /// Admitted to the roster; counts against capacity.
    Accepted,
    /// Admitted and locked in; counts against capacity.
    Locked,
    /// Declined by the host, or withdrawn by the applicant.
    Rejected,
    /// Removed by the host after admission.
    Kicked,
}

impl MemberState {
    /// Whether this state counts against the party's capacity.
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Accepted | Self::Locked)
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Kicked)
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Applied => "applied",
            Self::Accepted => "accepted",
            Self::Locked => "locked",
            Self::Rejected => "rejected",
            Self::Kicked => "kicked",
        };
        write!(f, "{name}")
    }
}

/// The active invite code of a private party.
///
/// Only the highest-generation code resolves; reissuing invalidates all prior
/// codes for the party immediately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    /// Opaque token presented by joining callers.
    pub token: String,
    /// Monotonic generation counter; bumped on every reissue.
    pub generation: u64,
}

impl InviteCode {
    /// Whether a presented token matches this (current-generation) code.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.token == presented
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Host-authored descriptive metadata for a party.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyProfile {
    /// Listing title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Advice from the host to applicants.
    pub host_tip: Option<String>,
    /// Human-readable schedule (the engine does not interpret it).
    pub schedule: Option<String>,
    /// Voice channel link shared with admitted members.
    pub voice_channel_link: Option<String>,
    /// Display name of the host.
    pub host_name: String,
}

/// A capacity-bounded roster organized by a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party identity.
    pub id: PartyId,
    /// Identity of the organizing host.
    pub host: UserId,
    /// Descriptive metadata.
    pub profile: PartyProfile,
    /// Public or invite-only.
    pub visibility: PartyVisibility,
    /// Roster ceiling; confirmed members never exceed it.
    pub capacity: Capacity,
    /// Lifecycle status.
    pub status: PartyStatus,
    /// Promote applications to `Accepted` inline when capacity allows.
    pub auto_accept: bool,
    /// Current invite code. Present iff the party is private.
    pub invite_code: Option<InviteCode>,
    /// When the party was created.
    pub created_at: DateTime<Utc>,
}

/// A role-tagged position within a party, optionally carrying equipment
/// requirements that submitted presets are validated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySlot {
    /// Slot identity, unique within the party.
    pub id: SlotId,
    /// Role tag, e.g. `"tank"` or `"healer"`.
    pub role: String,
    /// Equipment requirements for this slot.
    pub requirements: SlotRequirements,
}

/// One applicant's relationship to a party, tracked through the membership
/// state machine. Records are never deleted; terminal states are retained
/// for history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    /// Membership record identity.
    pub id: MemberId,
    /// Slot the member occupies, if any.
    pub slot: Option<SlotId>,
    /// Identity of the applicant.
    pub applicant: UserId,
    /// Gear preset submitted with the application, if any.
    pub preset: Option<GearPreset>,
    /// Current state-machine state.
    pub state: MemberState,
    /// When the application was submitted.
    pub created_at: DateTime<Utc>,
    /// When the record last changed state.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Aggregate Record
// ============================================================================

/// The unit of storage and mutual exclusion: a party together with its slots
/// and full membership history.
///
/// Every mutating operation loads one record, applies a transition, and writes
/// it back under an optimistic version check. The capacity invariant
/// (`confirmed_count() ≤ capacity`) holds after every committed transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyRecord {
    /// The party itself.
    pub party: Party,
    /// Role slots, unique by id.
    pub slots: Vec<PartySlot>,
    /// Membership records, append-only.
    pub members: Vec<PartyMember>,
}

impl PartyRecord {
    /// Wrap a freshly created party with empty slots and membership.
    #[must_use]
    pub const fn new(party: Party) -> Self {
        Self {
            party,
            slots: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Number of members currently counting against capacity.
    #[must_use]
    pub fn confirmed_count(&self) -> u32 {
        let confirmed = self
            .members
            .iter()
            .filter(|m| m.state.is_confirmed())
            .count();
        // Bounded by capacity in practice, which is a u32.
        u32::try_from(confirmed).unwrap_or(u32::MAX)
    }

    /// Seats still available for confirmation.
    #[must_use]
    pub fn open_seats(&self) -> u32 {
        self.party
            .capacity
            .value()
            .saturating_sub(self.confirmed_count())
    }

    /// Look up a member by id.
    #[must_use]
    pub fn find_member(&self, id: MemberId) -> Option<&PartyMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Look up a member by id, mutably.
    pub fn find_member_mut(&mut self, id: MemberId) -> Option<&mut PartyMember> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    /// Look up a slot by id.
    #[must_use]
    pub fn find_slot(&self, id: SlotId) -> Option<&PartySlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Whether any confirmed member occupies the given slot.
    #[must_use]
    pub fn slot_has_confirmed_member(&self, id: SlotId) -> bool {
        self.members
            .iter()
            .any(|m| m.slot == Some(id) && m.state.is_confirmed())
    }

    /// Build the read-model view of this record.
    #[must_use]
    pub fn detail(&self) -> PartyDetail {
        PartyDetail {
            party: self.party.clone(),
            slots: self.slots.clone(),
            members: self.members.clone(),
            confirmed: self.confirmed_count(),
            open_seats: self.open_seats(),
        }
    }
}

/// Read-model view of a party: the record plus derived occupancy counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyDetail {
    /// The party itself.
    pub party: Party,
    /// Role slots.
    pub slots: Vec<PartySlot>,
    /// Membership records.
    pub members: Vec<PartyMember>,
    /// Members counting against capacity.
    pub confirmed: u32,
    /// Seats still available for confirmation.
    pub open_seats: u32,
}

// ============================================================================
// Domain Events
// ============================================================================

/// Facts emitted by committed transitions, delivered to the notification
/// collaborator after the owning record has been persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PartyEvent {
    /// A party was created.
    PartyCreated {
        /// Host identity.
        host: UserId,
        /// Listing title.
        title: String,
    },
    /// An application was submitted.
    MemberApplied {
        /// Membership record identity.
        member_id: MemberId,
        /// Applicant identity.
        applicant: UserId,
        /// Requested slot, if any.
        slot: Option<SlotId>,
    },
    /// A member was admitted to the roster.
    MemberAccepted {
        /// Membership record identity.
        member_id: MemberId,
        /// Applicant identity.
        applicant: UserId,
    },
    /// A member was locked in.
    MemberLocked {
        /// Membership record identity.
        member_id: MemberId,
    },
    /// An application was declined or withdrawn.
    MemberRejected {
        /// Membership record identity.
        member_id: MemberId,
    },
    /// A member was removed by the host.
    MemberKicked {
        /// Membership record identity.
        member_id: MemberId,
    },
    /// The invite code was rotated; all prior codes are invalid.
    InviteCodeReissued {
        /// New generation counter.
        generation: u64,
    },
    /// The party's lifecycle status changed.
    PartyStatusChanged {
        /// New status.
        status: PartyStatus,
    },
    /// A slot was added to the party.
    SlotAdded {
        /// Slot identity.
        slot_id: SlotId,
        /// Role tag.
        role: String,
    },
}

impl PartyEvent {
    /// Stable, versioned event type identifier.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::PartyCreated { .. } => "PartyCreated.v1",
            Self::MemberApplied { .. } => "MemberApplied.v1",
            Self::MemberAccepted { .. } => "MemberAccepted.v1",
            Self::MemberLocked { .. } => "MemberLocked.v1",
            Self::MemberRejected { .. } => "MemberRejected.v1",
            Self::MemberKicked { .. } => "MemberKicked.v1",
            Self::InviteCodeReissued { .. } => "InviteCodeReissued.v1",
            Self::PartyStatusChanged { .. } => "PartyStatusChanged.v1",
            Self::SlotAdded { .. } => "SlotAdded.v1",
        }
    }
}
