//! Slot catalog: role-tagged positions within a party.
//!
//! Slots are independent of membership except for one rule: once a confirmed
//! member references a slot, its requirements are frozen — changing them
//! would invalidate presets that were already validated against them.

use crate::error::AdmissionError;
use crate::preset::SlotRequirements;
use crate::types::{PartyEvent, PartyRecord, PartySlot, SlotId, UserId};
use smallvec::{SmallVec, smallvec};

/// Add a slot to the party. Host-only.
///
/// # Errors
///
/// Returns [`AdmissionError::NotAuthorized`] if the actor is not the host.
pub fn add_slot(
    record: &mut PartyRecord,
    actor: &UserId,
    role: impl Into<String>,
    requirements: SlotRequirements,
) -> Result<(SlotId, SmallVec<[PartyEvent; 2]>), AdmissionError> {
    if *actor != record.party.host {
        return Err(AdmissionError::NotAuthorized);
    }

    let slot_id = SlotId::new();
    let role = role.into();
    record.slots.push(PartySlot {
        id: slot_id,
        role: role.clone(),
        requirements,
    });

    Ok((slot_id, smallvec![PartyEvent::SlotAdded { slot_id, role }]))
}

/// Replace a slot's requirements. Host-only.
///
/// # Errors
///
/// - [`AdmissionError::NotAuthorized`] if the actor is not the host.
/// - [`AdmissionError::NotFound`] if the slot does not exist.
/// - [`AdmissionError::SlotLocked`] once at least one accepted or locked
///   member references the slot.
pub fn update_requirements(
    record: &mut PartyRecord,
    actor: &UserId,
    slot_id: SlotId,
    requirements: SlotRequirements,
) -> Result<(), AdmissionError> {
    if *actor != record.party.host {
        return Err(AdmissionError::NotAuthorized);
    }
    if record.find_slot(slot_id).is_none() {
        return Err(AdmissionError::NotFound);
    }
    if record.slot_has_confirmed_member(slot_id) {
        return Err(AdmissionError::SlotLocked);
    }

    if let Some(slot) = record.slots.iter_mut().find(|s| s.id == slot_id) {
        slot.requirements = requirements;
    }
    Ok(())
}
