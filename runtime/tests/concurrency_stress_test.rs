//! Concurrency stress tests.
//!
//! Races many tasks against a single party to verify the two guarantees the
//! coordinator exists for: the capacity invariant survives concurrent
//! admissions, and an invite reissue racing a join never leaves an ambiguous
//! member record.
//!
//! Run with: `cargo test --test concurrency_stress_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use party_planner_core::error::AdmissionError;
use party_planner_core::ledger::TransitionRequest;
use party_planner_core::types::{MemberState, PartyProfile, PartyVisibility, UserId};
use party_planner_runtime::config::CoordinatorConfig;
use party_planner_runtime::service::{ApplyRequest, CreatePartyRequest, PartyService};
use party_planner_testing::{InMemoryPartyStore, RecordingSink, SequenceCodeIssuer, test_clock};
use std::sync::Arc;

fn stress_service() -> PartyService {
    // Repeated init across tests is fine; only the first call wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    PartyService::with_environment(
        Arc::new(InMemoryPartyStore::new()),
        Arc::new(RecordingSink::new()),
        Arc::new(test_clock()),
        Arc::new(SequenceCodeIssuer::new(["ABC123"])),
        &CoordinatorConfig::default(),
    )
}

fn party_request(visibility: PartyVisibility, capacity: u32) -> CreatePartyRequest {
    CreatePartyRequest {
        host: UserId::from("host"),
        profile: PartyProfile {
            title: "stress target".to_string(),
            host_name: "host".to_string(),
            ..PartyProfile::default()
        },
        visibility,
        capacity,
        auto_accept: false,
    }
}

/// N racing apply-then-approve sequences against capacity K < N: exactly K
/// land in `Accepted`, every other approval fails `CapacityExceeded`, and the
/// failed members remain `Applied`.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn capacity_invariant_survives_racing_admissions() {
    const CAPACITY: u32 = 3;
    const CONTENDERS: usize = 24;

    let service = Arc::new(stress_service());
    let party = service
        .create_party(party_request(PartyVisibility::Public, CAPACITY))
        .await
        .unwrap();
    let party_id = party.party.id;

    let mut handles = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let member = service
                .apply(
                    party_id,
                    ApplyRequest {
                        applicant: UserId::from(format!("raider{i}").as_str()),
                        slot: None,
                        preset: None,
                    },
                )
                .await
                .unwrap();
            service
                .set_member_state(
                    party_id,
                    member.id,
                    TransitionRequest::to(MemberState::Accepted),
                    &UserId::from("host"),
                )
                .await
        }));
    }

    let mut accepted = 0;
    let mut capacity_exceeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(member) => {
                assert_eq!(member.state, MemberState::Accepted);
                accepted += 1;
            }
            Err(AdmissionError::CapacityExceeded { capacity }) => {
                assert_eq!(capacity, CAPACITY);
                capacity_exceeded += 1;
            }
            Err(other) => panic!("unexpected admission error: {other:?}"),
        }
    }

    assert_eq!(accepted, CAPACITY as usize);
    assert_eq!(capacity_exceeded, CONTENDERS - CAPACITY as usize);

    let detail = service.get_party(party_id).await.unwrap();
    assert_eq!(detail.confirmed, CAPACITY);
    assert_eq!(detail.members.len(), CONTENDERS);
    assert_eq!(
        detail
            .members
            .iter()
            .filter(|m| m.state == MemberState::Applied)
            .count(),
        CONTENDERS - CAPACITY as usize
    );
}

/// Auto-accept under contention: admissions happen inline inside the
/// exclusive section, so the confirmed count still lands exactly on
/// capacity and the overflow queues.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn auto_accept_under_contention_never_overshoots() {
    const CAPACITY: u32 = 5;
    const CONTENDERS: usize = 32;

    let service = Arc::new(stress_service());
    let mut request = party_request(PartyVisibility::Public, CAPACITY);
    request.auto_accept = true;
    let party = service.create_party(request).await.unwrap();
    let party_id = party.party.id;

    let mut handles = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .apply(
                    party_id,
                    ApplyRequest {
                        applicant: UserId::from(format!("walkin{i}").as_str()),
                        slot: None,
                        preset: None,
                    },
                )
                .await
        }));
    }

    let mut admitted = 0;
    let mut queued = 0;
    for handle in handles {
        let member = handle.await.unwrap().unwrap();
        match member.state {
            MemberState::Accepted => admitted += 1,
            MemberState::Applied => queued += 1,
            other => panic!("unexpected member state: {other}"),
        }
    }

    assert_eq!(admitted, CAPACITY as usize);
    assert_eq!(queued, CONTENDERS - CAPACITY as usize);

    let detail = service.get_party(party_id).await.unwrap();
    assert_eq!(detail.confirmed, CAPACITY);
}

/// A join racing a code reissue either fully succeeds under the old code or
/// fully fails `CodeInvalid`. Either way the roster is unambiguous: a member
/// record exists iff the join reported success.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reissue_join_race_leaves_no_ambiguous_state() {
    const ROUNDS: usize = 25;

    for round in 0..ROUNDS {
        let service = Arc::new(stress_service());
        let party = service
            .create_party(party_request(PartyVisibility::Private, 10))
            .await
            .unwrap();
        let party_id = party.party.id;

        let joiner = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .join_by_code(
                        "ABC123",
                        ApplyRequest {
                            applicant: UserId::from("bob"),
                            slot: None,
                            preset: None,
                        },
                    )
                    .await
            })
        };
        let reissuer = {
            let service = Arc::clone(&service);
            tokio::spawn(
                async move { service.reissue_invite_code(party_id, &UserId::from("host")).await },
            )
        };

        let join_result = joiner.await.unwrap();
        reissuer.await.unwrap().unwrap();

        let detail = service.get_party(party_id).await.unwrap();
        match join_result {
            Ok(response) => {
                assert!(
                    detail.members.iter().any(|m| m.id == response.member.id),
                    "round {round}: successful join must have committed its record"
                );
            }
            Err(AdmissionError::CodeInvalid) => {
                assert!(
                    detail.members.is_empty(),
                    "round {round}: failed join must leave no member record"
                );
            }
            Err(other) => panic!("round {round}: unexpected join error: {other:?}"),
        }

        // After the dust settles the old code never resolves again.
        let err = service
            .join_by_code(
                "ABC123",
                ApplyRequest {
                    applicant: UserId::from("carol"),
                    slot: None,
                    preset: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AdmissionError::CodeInvalid);
    }
}

/// Operations on different parties do not serialize behind one another: a
/// full roster on one party never affects admissions on another.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn independent_parties_admit_independently() {
    const PARTIES: usize = 6;
    const APPLICANTS_PER_PARTY: usize = 8;

    let service = Arc::new(stress_service());
    let mut party_ids = Vec::with_capacity(PARTIES);
    for _ in 0..PARTIES {
        let mut request = party_request(PartyVisibility::Public, APPLICANTS_PER_PARTY as u32);
        request.auto_accept = true;
        party_ids.push(service.create_party(request).await.unwrap().party.id);
    }

    let mut handles = Vec::new();
    for (p, party_id) in party_ids.iter().copied().enumerate() {
        for i in 0..APPLICANTS_PER_PARTY {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .apply(
                        party_id,
                        ApplyRequest {
                            applicant: UserId::from(format!("p{p}-member{i}").as_str()),
                            slot: None,
                            preset: None,
                        },
                    )
                    .await
            }));
        }
    }

    for handle in handles {
        let member = handle.await.unwrap().unwrap();
        assert_eq!(member.state, MemberState::Accepted);
    }

    for party_id in party_ids {
        let detail = service.get_party(party_id).await.unwrap();
        assert_eq!(detail.confirmed, APPLICANTS_PER_PARTY as u32);
    }
}
