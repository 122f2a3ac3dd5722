//! Invite code registry: issue, resolve, and rotate codes for private
//! parties.
//!
//! A private, open party holds exactly one active code. Codes carry a
//! generation counter; only the highest generation resolves, and reissuing
//! invalidates every prior code for the party in the same atomic step that
//! persists the record. Resolution failures are uniform — a stale code, a
//! foreign code, and a code against a public or closed party all report
//! [`AdmissionError::CodeInvalid`], so callers cannot probe which case they
//! hit.

use crate::environment::CodeIssuer;
use crate::error::{AdmissionError, ValidationError};
use crate::types::{InviteCode, Party, PartyEvent, PartyRecord, PartyStatus, PartyVisibility, UserId};
use smallvec::{SmallVec, smallvec};

/// Issue the first invite code for a newly created private party.
///
/// Called once at party creation; public parties never carry a code.
///
/// # Errors
///
/// Returns [`AdmissionError::Validation`] with reason `party_not_private`
/// when the party is public.
pub fn issue(party: &mut Party, issuer: &dyn CodeIssuer) -> Result<InviteCode, AdmissionError> {
    if party.visibility != PartyVisibility::Private {
        return Err(ValidationError::new("party_not_private").into());
    }

    let code = InviteCode {
        token: issuer.generate(),
        generation: 1,
    };
    party.invite_code = Some(code.clone());
    Ok(code)
}

/// Rotate the party's invite code, invalidating all prior codes immediately.
///
/// Host-only, and idempotently repeatable: each call produces a fresh token
/// and bumps the generation, leaving exactly one valid code. Must run inside
/// the coordinator's exclusive section so a racing `join_by_code` either
/// resolves the old code before the rotation commits, or observes
/// `CodeInvalid` — never an in-between state.
///
/// # Errors
///
/// - [`AdmissionError::NotAuthorized`] if the actor is not the host.
/// - [`AdmissionError::Validation`] (`party_not_private`) for public parties.
pub fn reissue(
    record: &mut PartyRecord,
    actor: &UserId,
    issuer: &dyn CodeIssuer,
) -> Result<(InviteCode, SmallVec<[PartyEvent; 2]>), AdmissionError> {
    if *actor != record.party.host {
        return Err(AdmissionError::NotAuthorized);
    }
    if record.party.visibility != PartyVisibility::Private {
        return Err(ValidationError::new("party_not_private").into());
    }

    let generation = record
        .party
        .invite_code
        .as_ref()
        .map_or(1, |code| code.generation + 1);
    let code = InviteCode {
        token: issuer.generate(),
        generation,
    };
    record.party.invite_code = Some(code.clone());

    Ok((code, smallvec![PartyEvent::InviteCodeReissued { generation }]))
}

/// Check a presented code against the party's current generation.
///
/// Passes only when the party is private, open, and the token matches the
/// active code exactly.
///
/// # Errors
///
/// Returns [`AdmissionError::CodeInvalid`] in every failing case, uniformly.
pub fn resolve(record: &PartyRecord, presented: &str) -> Result<(), AdmissionError> {
    let valid = record.party.visibility == PartyVisibility::Private
        && record.party.status == PartyStatus::Open
        && record
            .party
            .invite_code
            .as_ref()
            .is_some_and(|code| code.matches(presented));

    if valid {
        Ok(())
    } else {
        Err(AdmissionError::CodeInvalid)
    }
}
