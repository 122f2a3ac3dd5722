//! The membership ledger: the state machine at the heart of the engine.
//!
//! All functions here are pure with respect to shared state — they take a
//! mutable [`PartyRecord`], decide whether the requested change is legal, and
//! either apply it and return the domain events the commit must publish, or
//! return an error leaving the record untouched. Serialization of concurrent
//! callers and persistence of the mutated record are the coordinator's job.
//!
//! State graph:
//!
//! ```text
//! Applied ──> Accepted ──> Locked
//!    │           │  │         │
//!    │           │  └──> Kicked <┘
//!    └──> Rejected <┘
//! ```
//!
//! `Rejected` and `Kicked` are terminal. Only transitions *into* a confirmed
//! state (`Accepted`, `Locked`) re-check the capacity invariant, against the
//! live count at the instant of transition.

use crate::error::{AdmissionError, ValidationError};
use crate::preset::{self, GearPreset};
use crate::types::{
    MemberId, MemberState, PartyEvent, PartyMember, PartyRecord, PartyStatus, SlotId, UserId,
};
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};

// ============================================================================
// Requests
// ============================================================================

/// An application to join a party.
#[derive(Clone, Debug)]
pub struct SubmitRequest {
    /// Identity of the applicant.
    pub applicant: UserId,
    /// Slot the applicant wants to fill, if any.
    pub slot: Option<SlotId>,
    /// Gear preset submitted for validation, if any.
    pub preset: Option<GearPreset>,
}

/// A host (or self-withdrawal) decision on a membership record.
#[derive(Clone, Debug)]
pub struct TransitionRequest {
    /// State to move the member into.
    pub target: MemberState,
    /// Reassign the member to this slot as part of the transition.
    pub slot: Option<SlotId>,
}

impl TransitionRequest {
    /// A plain state change without slot reassignment.
    #[must_use]
    pub const fn to(target: MemberState) -> Self {
        Self { target, slot: None }
    }
}

// ============================================================================
// Submit
// ============================================================================

/// Submit an application, creating a membership record in `Applied`.
///
/// For auto-accept parties the record is promoted `Applied → Accepted` inline
/// as part of the same atomic step, still subject to the capacity check; when
/// the roster is full the record simply stays `Applied` (queued) rather than
/// failing the caller.
///
/// # Errors
///
/// - [`AdmissionError::NotFound`] if the party is not open or the requested
///   slot does not exist. A closed or cancelled roster is not joinable and is
///   indistinguishable from an absent one.
/// - [`AdmissionError::DuplicateApplication`] if the applicant already holds
///   a record in `Applied`, `Accepted`, or `Locked`.
/// - [`AdmissionError::NotAuthorized`] if the applicant was kicked from this
///   party. Terminal-state re-application is a product decision; kicked
///   members stay out by default.
/// - [`AdmissionError::Validation`] if the submitted preset fails the slot's
///   requirements, or the slot requires a preset and none was submitted. No
///   member record is created.
pub fn submit(
    record: &mut PartyRecord,
    request: SubmitRequest,
    now: DateTime<Utc>,
) -> Result<(MemberId, SmallVec<[PartyEvent; 2]>), AdmissionError> {
    if record.party.status != PartyStatus::Open {
        return Err(AdmissionError::NotFound);
    }

    for member in record.members.iter().filter(|m| m.applicant == request.applicant) {
        match member.state {
            MemberState::Applied | MemberState::Accepted | MemberState::Locked => {
                return Err(AdmissionError::DuplicateApplication);
            }
            MemberState::Kicked => return Err(AdmissionError::NotAuthorized),
            MemberState::Rejected => {}
        }
    }

    if let Some(slot_id) = request.slot {
        let slot = record.find_slot(slot_id).ok_or(AdmissionError::NotFound)?;
        match &request.preset {
            Some(preset) => preset::validate(preset, &slot.requirements)?,
            None if !slot.requirements.is_empty() => {
                return Err(ValidationError::new("preset_required").into());
            }
            None => {}
        }
    }

    let member_id = MemberId::new();
    let auto_accept = record.party.auto_accept && record.open_seats() > 0;

    let state = if auto_accept {
        MemberState::Accepted
    } else {
        MemberState::Applied
    };

    record.members.push(PartyMember {
        id: member_id,
        slot: request.slot,
        applicant: request.applicant.clone(),
        preset: request.preset,
        state,
        created_at: now,
        updated_at: now,
    });

    let mut events: SmallVec<[PartyEvent; 2]> = smallvec![PartyEvent::MemberApplied {
        member_id,
        applicant: request.applicant.clone(),
        slot: request.slot,
    }];
    if auto_accept {
        events.push(PartyEvent::MemberAccepted {
            member_id,
            applicant: request.applicant,
        });
    }

    Ok((member_id, events))
}

// ============================================================================
// Transition
// ============================================================================

/// Move a membership record along one edge of the state graph.
///
/// Validates, in spec order: actor authorization, edge legality, and — only
/// for entry into `Accepted` or `Locked` — the capacity invariant against the
/// live confirmed count. On any failure the member remains in its prior
/// state; there is no partial mutation.
///
/// # Errors
///
/// - [`AdmissionError::NotFound`] if the member (or reassignment slot) does
///   not exist.
/// - [`AdmissionError::NotAuthorized`] unless the actor is the host, or — for
///   the `Rejected` edge only — the member themself (withdrawal).
/// - [`AdmissionError::InvalidTransition`] for edges outside the graph.
/// - [`AdmissionError::CapacityExceeded`] when confirming the member would
///   breach capacity.
/// - [`AdmissionError::Validation`] when a slot reassignment invalidates the
///   member's previously validated preset.
pub fn transition(
    record: &mut PartyRecord,
    member_id: MemberId,
    request: TransitionRequest,
    actor: &UserId,
    now: DateTime<Utc>,
) -> Result<SmallVec<[PartyEvent; 2]>, AdmissionError> {
    let (current, applicant) = {
        let member = record.find_member(member_id).ok_or(AdmissionError::NotFound)?;
        (member.state, member.applicant.clone())
    };

    authorize(&record.party.host, &applicant, actor, request.target)?;

    if !edge_allowed(current, request.target) {
        return Err(AdmissionError::InvalidTransition {
            from: current,
            to: request.target,
        });
    }

    // Entering a confirmed state claims a seat; a member that is already
    // confirmed keeps the seat it holds.
    if request.target.is_confirmed()
        && !current.is_confirmed()
        && record.open_seats() == 0
    {
        return Err(AdmissionError::CapacityExceeded {
            capacity: record.party.capacity.value(),
        });
    }

    if let Some(slot_id) = request.slot {
        let slot = record.find_slot(slot_id).ok_or(AdmissionError::NotFound)?;
        if let Some(member) = record.find_member(member_id) {
            if let Some(preset) = &member.preset {
                preset::validate(preset, &slot.requirements)?;
            }
        }
    }

    let member = record
        .find_member_mut(member_id)
        .ok_or(AdmissionError::NotFound)?;
    if let Some(slot_id) = request.slot {
        member.slot = Some(slot_id);
    }
    member.state = request.target;
    member.updated_at = now;

    let event = match request.target {
        MemberState::Accepted => PartyEvent::MemberAccepted {
            member_id,
            applicant,
        },
        MemberState::Locked => PartyEvent::MemberLocked { member_id },
        MemberState::Rejected => PartyEvent::MemberRejected { member_id },
        MemberState::Kicked => PartyEvent::MemberKicked { member_id },
        // No edge leads back into Applied; edge_allowed already rejected it.
        MemberState::Applied => {
            return Err(AdmissionError::InvalidTransition {
                from: current,
                to: request.target,
            });
        }
    };

    Ok(smallvec![event])
}

/// Whether the edge `from → to` exists in the membership state graph.
#[must_use]
pub const fn edge_allowed(from: MemberState, to: MemberState) -> bool {
    matches!(
        (from, to),
        (MemberState::Applied, MemberState::Accepted | MemberState::Rejected)
            | (
                MemberState::Accepted,
                MemberState::Locked | MemberState::Kicked | MemberState::Rejected
            )
            | (MemberState::Locked, MemberState::Kicked)
    )
}

/// Host privilege is required for every decision except withdrawal: the
/// `Rejected` edge may also be driven by the member themself.
fn authorize(
    host: &UserId,
    applicant: &UserId,
    actor: &UserId,
    target: MemberState,
) -> Result<(), AdmissionError> {
    let allowed = match target {
        MemberState::Rejected => actor == host || actor == applicant,
        _ => actor == host,
    };
    if allowed {
        Ok(())
    } else {
        Err(AdmissionError::NotAuthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::preset::SlotRequirements;
    use crate::types::{
        Capacity, Party, PartyId, PartyProfile, PartySlot, PartyVisibility, SlotId,
    };
    use proptest::prelude::*;

    fn test_party(capacity: u32, auto_accept: bool) -> PartyRecord {
        PartyRecord::new(Party {
            id: PartyId::new(),
            host: UserId::from("host"),
            profile: PartyProfile {
                title: "HCE run".to_string(),
                host_name: "host".to_string(),
                ..PartyProfile::default()
            },
            visibility: PartyVisibility::Public,
            capacity: Capacity::new(capacity),
            status: PartyStatus::Open,
            auto_accept,
            invite_code: None,
            created_at: Utc::now(),
        })
    }

    fn apply_as(record: &mut PartyRecord, name: &str) -> MemberId {
        let (id, _) = submit(
            record,
            SubmitRequest {
                applicant: UserId::from(name),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap();
        id
    }

    fn host_sets(
        record: &mut PartyRecord,
        member: MemberId,
        target: MemberState,
    ) -> Result<SmallVec<[PartyEvent; 2]>, AdmissionError> {
        transition(
            record,
            member,
            TransitionRequest::to(target),
            &UserId::from("host"),
            Utc::now(),
        )
    }

    #[test]
    fn submit_creates_applied_member() {
        let mut record = test_party(5, false);
        let id = apply_as(&mut record, "alice");

        let member = record.find_member(id).unwrap();
        assert_eq!(member.state, MemberState::Applied);
        assert_eq!(record.confirmed_count(), 0);
    }

    #[test]
    fn duplicate_application_is_rejected() {
        let mut record = test_party(5, false);
        apply_as(&mut record, "alice");

        let err = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("alice"),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AdmissionError::DuplicateApplication);
        assert_eq!(record.members.len(), 1);
    }

    #[test]
    fn rejected_applicant_may_reapply_kicked_may_not() {
        let mut record = test_party(5, false);

        let alice = apply_as(&mut record, "alice");
        host_sets(&mut record, alice, MemberState::Rejected).unwrap();
        apply_as(&mut record, "alice");
        assert_eq!(record.members.len(), 2);

        let bob = apply_as(&mut record, "bob");
        host_sets(&mut record, bob, MemberState::Accepted).unwrap();
        host_sets(&mut record, bob, MemberState::Kicked).unwrap();
        let err = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("bob"),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AdmissionError::NotAuthorized);
    }

    #[test]
    fn closed_party_is_not_joinable() {
        let mut record = test_party(5, false);
        record.party.status = PartyStatus::Closed;

        let err = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("alice"),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AdmissionError::NotFound);
    }

    #[test]
    fn accept_fills_capacity_then_rejects() {
        // Capacity 1: approve A, approve B fails, kick A, approve B succeeds.
        let mut record = test_party(1, false);
        let a = apply_as(&mut record, "a");
        let b = apply_as(&mut record, "b");

        host_sets(&mut record, a, MemberState::Accepted).unwrap();

        let err = host_sets(&mut record, b, MemberState::Accepted).unwrap_err();
        assert_eq!(err, AdmissionError::CapacityExceeded { capacity: 1 });
        assert_eq!(record.find_member(b).unwrap().state, MemberState::Applied);

        host_sets(&mut record, a, MemberState::Kicked).unwrap();
        host_sets(&mut record, b, MemberState::Accepted).unwrap();
        assert_eq!(record.find_member(b).unwrap().state, MemberState::Accepted);
        assert_eq!(record.confirmed_count(), 1);
    }

    #[test]
    fn locking_an_accepted_member_does_not_consume_a_seat() {
        let mut record = test_party(1, false);
        let a = apply_as(&mut record, "a");
        host_sets(&mut record, a, MemberState::Accepted).unwrap();

        // The member already holds the only seat; locking must not trip the
        // capacity check.
        host_sets(&mut record, a, MemberState::Locked).unwrap();
        assert_eq!(record.find_member(a).unwrap().state, MemberState::Locked);
    }

    #[test]
    fn illegal_edges_fail_with_invalid_transition() {
        let mut record = test_party(3, false);
        let a = apply_as(&mut record, "a");
        host_sets(&mut record, a, MemberState::Accepted).unwrap();
        host_sets(&mut record, a, MemberState::Locked).unwrap();

        let err = host_sets(&mut record, a, MemberState::Accepted).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::InvalidTransition {
                from: MemberState::Locked,
                to: MemberState::Accepted,
            }
        );

        let b = apply_as(&mut record, "b");
        host_sets(&mut record, b, MemberState::Rejected).unwrap();
        for target in [
            MemberState::Accepted,
            MemberState::Locked,
            MemberState::Kicked,
            MemberState::Rejected,
        ] {
            let err = host_sets(&mut record, b, target).unwrap_err();
            assert!(matches!(err, AdmissionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn locked_members_can_still_be_kicked() {
        let mut record = test_party(3, false);
        let a = apply_as(&mut record, "a");
        host_sets(&mut record, a, MemberState::Accepted).unwrap();
        host_sets(&mut record, a, MemberState::Locked).unwrap();
        host_sets(&mut record, a, MemberState::Kicked).unwrap();
        assert_eq!(record.find_member(a).unwrap().state, MemberState::Kicked);
    }

    #[test]
    fn only_host_may_accept_but_member_may_withdraw() {
        let mut record = test_party(3, false);
        let a = apply_as(&mut record, "alice");

        let err = transition(
            &mut record,
            a,
            TransitionRequest::to(MemberState::Accepted),
            &UserId::from("alice"),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AdmissionError::NotAuthorized);

        // Withdrawal is the Rejected edge driven by the member themself.
        transition(
            &mut record,
            a,
            TransitionRequest::to(MemberState::Rejected),
            &UserId::from("alice"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.find_member(a).unwrap().state, MemberState::Rejected);

        let b = apply_as(&mut record, "bob");
        let err = transition(
            &mut record,
            b,
            TransitionRequest::to(MemberState::Rejected),
            &UserId::from("mallory"),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AdmissionError::NotAuthorized);
    }

    #[test]
    fn auto_accept_promotes_inline_and_degrades_when_full() {
        let mut record = test_party(1, true);

        let (first, events) = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("a"),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            record.find_member(first).unwrap().state,
            MemberState::Accepted
        );

        // Roster full: the second application queues instead of erroring.
        let (second, events) = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("b"),
                slot: None,
                preset: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            record.find_member(second).unwrap().state,
            MemberState::Applied
        );
        assert_eq!(record.confirmed_count(), 1);
    }

    #[test]
    fn preset_failing_slot_requirements_creates_no_record() {
        let mut record = test_party(5, false);
        let slot_id = SlotId::new();
        record.slots.push(PartySlot {
            id: slot_id,
            role: "dps".to_string(),
            requirements: SlotRequirements {
                min_ip: Some(1200),
                ..SlotRequirements::default()
            },
        });

        let mut preset = crate::preset::tests_support::minimal_preset("bow");
        preset.ip_target = 1000;

        let err = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("alice"),
                slot: Some(slot_id),
                preset: Some(preset),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Validation(ValidationError::new("ip_below_minimum"))
        );
        assert!(record.members.is_empty());
    }

    #[test]
    fn slot_with_requirements_demands_a_preset() {
        let mut record = test_party(5, false);
        let slot_id = SlotId::new();
        record.slots.push(PartySlot {
            id: slot_id,
            role: "tank".to_string(),
            requirements: SlotRequirements {
                min_ip: Some(1100),
                ..SlotRequirements::default()
            },
        });

        let err = submit(
            &mut record,
            SubmitRequest {
                applicant: UserId::from("alice"),
                slot: Some(slot_id),
                preset: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Validation(ValidationError::new("preset_required"))
        );
    }

    // ========================================================================
    // Property: the capacity invariant survives arbitrary operation sequences
    // ========================================================================

    #[derive(Clone, Debug)]
    enum Op {
        Submit(usize),
        Transition(usize, MemberState),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8usize).prop_map(Op::Submit),
            (0..16usize, target_strategy()).prop_map(|(i, t)| Op::Transition(i, t)),
        ]
    }

    fn target_strategy() -> impl Strategy<Value = MemberState> {
        prop_oneof![
            Just(MemberState::Accepted),
            Just(MemberState::Locked),
            Just(MemberState::Rejected),
            Just(MemberState::Kicked),
        ]
    }

    proptest! {
        #[test]
        fn confirmed_count_never_exceeds_capacity(
            capacity in 1u32..5,
            ops in proptest::collection::vec(op_strategy(), 1..60),
        ) {
            let mut record = test_party(capacity, false);
            let host = UserId::from("host");

            for op in ops {
                match op {
                    Op::Submit(i) => {
                        let _ = submit(
                            &mut record,
                            SubmitRequest {
                                applicant: UserId::from(format!("user{i}").as_str()),
                                slot: None,
                                preset: None,
                            },
                            Utc::now(),
                        );
                    }
                    Op::Transition(i, target) => {
                        if record.members.is_empty() {
                            continue;
                        }
                        let member_id = record.members[i % record.members.len()].id;
                        let _ = transition(
                            &mut record,
                            member_id,
                            TransitionRequest::to(target),
                            &host,
                            Utc::now(),
                        );
                    }
                }

                prop_assert!(record.confirmed_count() <= record.party.capacity.value());
            }
        }
    }
}
