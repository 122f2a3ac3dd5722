//! The operation surface consumed by the transport layer.
//!
//! [`PartyService`] exposes the engine's public operations: `create_party`,
//! `apply`, `join_by_code`, `set_member_state`, `reissue_invite_code`, the
//! slot and saved-preset catalogs, and the read-only party views. Every
//! mutating operation is expressed as a decision function executed through
//! the [`AdmissionCoordinator`] — nothing mutates a ledger directly.
//!
//! Read-only views (`get_party`, `list_slots`, `list_parties`,
//! `list_members`) bypass the per-party lock; slightly stale reads are
//! acceptable there.

use crate::config::CoordinatorConfig;
use crate::coordinator::AdmissionCoordinator;
use party_planner_core::environment::{
    Clock, CodeIssuer, NotificationSink, RandomCodeIssuer, SystemClock,
};
use party_planner_core::error::{AdmissionError, ValidationError};
use party_planner_core::ledger::{self, SubmitRequest, TransitionRequest};
use party_planner_core::preset::{GearPreset, SlotRequirements};
use party_planner_core::presets_library::{PresetId, PresetLibrary, PresetVisibility, SavedPreset};
use party_planner_core::store::PartyStore;
use party_planner_core::types::{
    Capacity, InviteCode, MemberId, Party, PartyDetail, PartyEvent, PartyId, PartyMember,
    PartyProfile, PartyRecord, PartySlot, PartyStatus, PartyVisibility, SlotId, UserId,
};
use party_planner_core::{invite, slots};
use smallvec::smallvec;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Requests and responses
// ============================================================================

/// Input to [`PartyService::create_party`].
#[derive(Clone, Debug)]
pub struct CreatePartyRequest {
    /// Organizing host identity.
    pub host: UserId,
    /// Descriptive metadata.
    pub profile: PartyProfile,
    /// Public or invite-only.
    pub visibility: PartyVisibility,
    /// Roster ceiling; must be at least 1.
    pub capacity: u32,
    /// Promote applications inline while capacity allows.
    pub auto_accept: bool,
}

/// Input to [`PartyService::apply`] and [`PartyService::join_by_code`].
#[derive(Clone, Debug)]
pub struct ApplyRequest {
    /// Applicant identity.
    pub applicant: UserId,
    /// Slot the applicant wants to fill, if any.
    pub slot: Option<SlotId>,
    /// Gear preset submitted for validation, if any.
    pub preset: Option<GearPreset>,
}

/// Result of a successful [`PartyService::join_by_code`].
#[derive(Clone, Debug)]
pub struct JoinResponse {
    /// The joined party, as a read view.
    pub party: PartyDetail,
    /// The freshly created membership record.
    pub member: PartyMember,
}

/// Read-model filter for [`PartyService::list_parties`].
#[derive(Clone, Debug, Default)]
pub struct PartyFilter {
    /// Restrict to a visibility.
    pub visibility: Option<PartyVisibility>,
    /// Case-insensitive substring match on slot roles.
    pub role: Option<String>,
    /// Case-insensitive substring match on the title.
    pub query: Option<String>,
}

// ============================================================================
// Service
// ============================================================================

/// The engine's public operation surface.
pub struct PartyService {
    coordinator: AdmissionCoordinator,
    clock: Arc<dyn Clock>,
    code_issuer: Arc<dyn CodeIssuer>,
    presets: RwLock<PresetLibrary>,
}

impl PartyService {
    /// Create a service with the production clock and code issuer.
    #[must_use]
    pub fn new(store: Arc<dyn PartyStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_environment(
            store,
            sink,
            Arc::new(SystemClock),
            Arc::new(RandomCodeIssuer::default()),
            &CoordinatorConfig::default(),
        )
    }

    /// Create a service with explicit environment seams and configuration.
    #[must_use]
    pub fn with_environment(
        store: Arc<dyn PartyStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        code_issuer: Arc<dyn CodeIssuer>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            coordinator: AdmissionCoordinator::with_config(store, sink, config),
            clock,
            code_issuer,
            presets: RwLock::new(PresetLibrary::new()),
        }
    }

    // ========================================================================
    // Mutating operations
    // ========================================================================

    /// Create a party. Private parties receive their first invite code as
    /// part of the same step.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Validation`] for a zero capacity or blank title.
    /// - [`AdmissionError::Unavailable`] on transient store faults.
    #[tracing::instrument(name = "create_party", skip_all, fields(host = %request.host))]
    pub async fn create_party(
        &self,
        request: CreatePartyRequest,
    ) -> Result<PartyDetail, AdmissionError> {
        if request.capacity == 0 {
            return Err(ValidationError::new("capacity_must_be_positive").into());
        }
        if request.profile.title.trim().is_empty() {
            return Err(ValidationError::new("title_required").into());
        }

        let mut party = Party {
            id: PartyId::new(),
            host: request.host.clone(),
            profile: request.profile,
            visibility: request.visibility,
            capacity: Capacity::new(request.capacity),
            status: PartyStatus::Open,
            auto_accept: request.auto_accept,
            invite_code: None,
            created_at: self.clock.now(),
        };
        if party.visibility == PartyVisibility::Private {
            invite::issue(&mut party, self.code_issuer.as_ref())?;
        }

        let record = PartyRecord::new(party);
        let detail = record.detail();
        let events = smallvec![PartyEvent::PartyCreated {
            host: request.host,
            title: detail.party.profile.title.clone(),
        }];
        self.coordinator.create(record, events).await?;

        Ok(detail)
    }

    /// Apply to a public party.
    ///
    /// Private parties only admit through [`join_by_code`](Self::join_by_code);
    /// applying to one directly fails with [`AdmissionError::CodeInvalid`].
    ///
    /// # Errors
    ///
    /// See [`ledger::submit`] for the full rejection taxonomy.
    #[tracing::instrument(name = "apply", skip_all, fields(%party_id, applicant = %request.applicant))]
    pub async fn apply(
        &self,
        party_id: PartyId,
        request: ApplyRequest,
    ) -> Result<PartyMember, AdmissionError> {
        let now = self.clock.now();
        self.coordinator
            .with_party(party_id, "apply", move |record| {
                if record.party.visibility == PartyVisibility::Private {
                    return Err(AdmissionError::CodeInvalid);
                }
                let (member_id, events) = ledger::submit(
                    record,
                    SubmitRequest {
                        applicant: request.applicant.clone(),
                        slot: request.slot,
                        preset: request.preset.clone(),
                    },
                    now,
                )?;
                let member = record
                    .find_member(member_id)
                    .cloned()
                    .ok_or(AdmissionError::NotFound)?;
                Ok((member, events))
            })
            .await
    }

    /// Join a private party by presenting its current invite code.
    ///
    /// The code is resolved twice: once outside the lock to route to the
    /// right party, and again inside the exclusive section against the
    /// freshly loaded record. The second check is what guarantees that a
    /// join racing a reissue either lands fully under the old code or fails
    /// [`AdmissionError::CodeInvalid`] — never in between.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::CodeInvalid`] for stale, foreign, or malformed
    ///   codes, uniformly.
    /// - See [`ledger::submit`] for the remaining rejection taxonomy.
    #[tracing::instrument(name = "join_by_code", skip_all, fields(applicant = %request.applicant))]
    pub async fn join_by_code(
        &self,
        code: &str,
        request: ApplyRequest,
    ) -> Result<JoinResponse, AdmissionError> {
        let party_id = self
            .coordinator
            .store()
            .find_by_code(code.to_string())
            .await
            .map_err(|err| AdmissionError::Unavailable(err.to_string()))?
            .ok_or(AdmissionError::CodeInvalid)?;

        let now = self.clock.now();
        let code = code.to_string();
        self.coordinator
            .with_party(party_id, "join_by_code", move |record| {
                invite::resolve(record, &code)?;
                let (member_id, events) = ledger::submit(
                    record,
                    SubmitRequest {
                        applicant: request.applicant.clone(),
                        slot: request.slot,
                        preset: request.preset.clone(),
                    },
                    now,
                )?;
                let member = record
                    .find_member(member_id)
                    .cloned()
                    .ok_or(AdmissionError::NotFound)?;
                Ok((
                    JoinResponse {
                        party: record.detail(),
                        member,
                    },
                    events,
                ))
            })
            .await
    }

    /// Drive a membership record along one edge of the state graph.
    ///
    /// Host privilege is required for every decision except withdrawal:
    /// a member may drive their own record into `Rejected`.
    ///
    /// # Errors
    ///
    /// See [`ledger::transition`] for the rejection taxonomy.
    #[tracing::instrument(name = "set_member_state", skip_all, fields(%party_id, %member_id, target = %request.target, actor = %actor))]
    pub async fn set_member_state(
        &self,
        party_id: PartyId,
        member_id: MemberId,
        request: TransitionRequest,
        actor: &UserId,
    ) -> Result<PartyMember, AdmissionError> {
        let now = self.clock.now();
        let actor = actor.clone();
        self.coordinator
            .with_party(party_id, "set_member_state", move |record| {
                let events = ledger::transition(record, member_id, request.clone(), &actor, now)?;
                let member = record
                    .find_member(member_id)
                    .cloned()
                    .ok_or(AdmissionError::NotFound)?;
                Ok((member, events))
            })
            .await
    }

    /// Change a party's lifecycle status. Host-only.
    ///
    /// Closing or cancelling a party stops admissions immediately; the roster
    /// and its history are retained.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotAuthorized`] if the actor is not the host.
    /// - [`AdmissionError::NotFound`] if the party does not exist.
    #[tracing::instrument(name = "set_party_status", skip_all, fields(%party_id, actor = %actor))]
    pub async fn set_party_status(
        &self,
        party_id: PartyId,
        status: PartyStatus,
        actor: &UserId,
    ) -> Result<PartyDetail, AdmissionError> {
        let actor = actor.clone();
        self.coordinator
            .with_party(party_id, "set_party_status", move |record| {
                if actor != record.party.host {
                    return Err(AdmissionError::NotAuthorized);
                }
                record.party.status = status;
                Ok((
                    record.detail(),
                    smallvec![PartyEvent::PartyStatusChanged { status }],
                ))
            })
            .await
    }

    /// Rotate a private party's invite code. Host-only; all prior codes stop
    /// resolving the instant the rotation commits.
    ///
    /// # Errors
    ///
    /// See [`invite::reissue`] for the rejection taxonomy.
    #[tracing::instrument(name = "reissue_invite_code", skip_all, fields(%party_id, actor = %actor))]
    pub async fn reissue_invite_code(
        &self,
        party_id: PartyId,
        actor: &UserId,
    ) -> Result<InviteCode, AdmissionError> {
        let actor = actor.clone();
        let issuer = Arc::clone(&self.code_issuer);
        self.coordinator
            .with_party(party_id, "reissue_invite_code", move |record| {
                invite::reissue(record, &actor, issuer.as_ref())
            })
            .await
    }

    /// Add a role slot to a party. Host-only.
    ///
    /// # Errors
    ///
    /// See [`slots::add_slot`] for the rejection taxonomy.
    #[tracing::instrument(name = "add_slot", skip_all, fields(%party_id, actor = %actor, role = %role))]
    pub async fn add_slot(
        &self,
        party_id: PartyId,
        actor: &UserId,
        role: String,
        requirements: SlotRequirements,
    ) -> Result<PartySlot, AdmissionError> {
        let actor = actor.clone();
        self.coordinator
            .with_party(party_id, "add_slot", move |record| {
                let (slot_id, events) =
                    slots::add_slot(record, &actor, role.clone(), requirements.clone())?;
                let slot = record
                    .find_slot(slot_id)
                    .cloned()
                    .ok_or(AdmissionError::NotFound)?;
                Ok((slot, events))
            })
            .await
    }

    /// Replace a slot's requirements. Host-only; fails with
    /// [`AdmissionError::SlotLocked`] once a confirmed member references the
    /// slot.
    ///
    /// # Errors
    ///
    /// See [`slots::update_requirements`] for the rejection taxonomy.
    #[tracing::instrument(name = "update_slot_requirements", skip_all, fields(%party_id, %slot_id, actor = %actor))]
    pub async fn update_slot_requirements(
        &self,
        party_id: PartyId,
        slot_id: SlotId,
        actor: &UserId,
        requirements: SlotRequirements,
    ) -> Result<(), AdmissionError> {
        let actor = actor.clone();
        self.coordinator
            .with_party(party_id, "update_slot_requirements", move |record| {
                slots::update_requirements(record, &actor, slot_id, requirements.clone())?;
                Ok(((), smallvec![]))
            })
            .await
    }

    // ========================================================================
    // Read-only views (no party lock; slightly stale reads are acceptable)
    // ========================================================================

    /// Fetch a party's read view.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotFound`] if the party does not exist.
    /// - [`AdmissionError::Unavailable`] on transient store faults.
    pub async fn get_party(&self, party_id: PartyId) -> Result<PartyDetail, AdmissionError> {
        Ok(self.coordinator.read(party_id).await?.detail())
    }

    /// List a party's slots.
    ///
    /// # Errors
    ///
    /// Same as [`get_party`](Self::get_party).
    pub async fn list_slots(&self, party_id: PartyId) -> Result<Vec<PartySlot>, AdmissionError> {
        Ok(self.coordinator.read(party_id).await?.slots)
    }

    /// List a party's membership records, terminal states included.
    ///
    /// # Errors
    ///
    /// Same as [`get_party`](Self::get_party).
    pub async fn list_members(
        &self,
        party_id: PartyId,
    ) -> Result<Vec<PartyMember>, AdmissionError> {
        Ok(self.coordinator.read(party_id).await?.members)
    }

    /// List parties matching a filter.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unavailable`] on transient store faults.
    pub async fn list_parties(
        &self,
        filter: &PartyFilter,
    ) -> Result<Vec<PartyDetail>, AdmissionError> {
        let records = self
            .coordinator
            .store()
            .list()
            .await
            .map_err(|err| AdmissionError::Unavailable(err.to_string()))?;

        Ok(records
            .iter()
            .filter(|record| matches_filter(record, filter))
            .map(PartyRecord::detail)
            .collect())
    }

    // ========================================================================
    // Saved preset catalog
    // ========================================================================

    /// Save a gear preset to the library.
    pub async fn save_preset(
        &self,
        owner: UserId,
        visibility: PresetVisibility,
        preset: GearPreset,
        metadata: Option<serde_json::Value>,
    ) -> PresetId {
        let now = self.clock.now();
        self.presets
            .write()
            .await
            .save(owner, visibility, preset, metadata, now)
    }

    /// Fetch a saved preset the caller is allowed to see.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotFound`] for absent presets and for another
    ///   owner's personal presets, indistinguishably.
    pub async fn get_preset(
        &self,
        id: PresetId,
        caller: &UserId,
    ) -> Result<SavedPreset, AdmissionError> {
        self.presets.read().await.get(id, caller).cloned()
    }

    /// List the presets visible to the caller.
    pub async fn list_presets(&self, caller: &UserId) -> Vec<SavedPreset> {
        self.presets.read().await.visible(caller).cloned().collect()
    }
}

fn matches_filter(record: &PartyRecord, filter: &PartyFilter) -> bool {
    if let Some(visibility) = filter.visibility {
        if record.party.visibility != visibility {
            return false;
        }
    }
    if let Some(query) = &filter.query {
        let title = record.party.profile.title.to_lowercase();
        if !title.contains(&query.to_lowercase()) {
            return false;
        }
    }
    if let Some(role) = &filter.role {
        let role = role.to_lowercase();
        if !record
            .slots
            .iter()
            .any(|slot| slot.role.to_lowercase().contains(&role))
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn filter_matches_on_visibility_title_and_role() {
        let mut record = PartyRecord::new(Party {
            id: PartyId::new(),
            host: UserId::from("host"),
            profile: PartyProfile {
                title: "Crystal League practice".to_string(),
                host_name: "host".to_string(),
                ..PartyProfile::default()
            },
            visibility: PartyVisibility::Public,
            capacity: Capacity::new(5),
            status: PartyStatus::Open,
            auto_accept: false,
            invite_code: None,
            created_at: Utc::now(),
        });
        record.slots.push(PartySlot {
            id: SlotId::new(),
            role: "Healer".to_string(),
            requirements: SlotRequirements::default(),
        });

        assert!(matches_filter(&record, &PartyFilter::default()));
        assert!(matches_filter(
            &record,
            &PartyFilter {
                visibility: Some(PartyVisibility::Public),
                role: Some("heal".to_string()),
                query: Some("crystal".to_string()),
            }
        ));
        assert!(!matches_filter(
            &record,
            &PartyFilter {
                visibility: Some(PartyVisibility::Private),
                ..PartyFilter::default()
            }
        ));
        assert!(!matches_filter(
            &record,
            &PartyFilter {
                role: Some("tank".to_string()),
                ..PartyFilter::default()
            }
        ));
    }
}
