//! Saved gear preset catalog.
//!
//! Players and guild officers keep reusable presets: `master` presets are
//! visible to everyone, `personal` presets only to their owner. The library
//! is a plain catalog — it has no concurrency obligations beyond those of
//! whatever holds it.

use crate::error::AdmissionError;
use crate::preset::GearPreset;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a saved preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetId(Uuid);

impl PresetId {
    /// Creates a new random `PresetId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PresetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who can see a saved preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetVisibility {
    /// Curated preset visible to everyone.
    Master,
    /// Visible to the owner only.
    Personal,
}

/// A preset stored in the library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedPreset {
    /// Saved preset identity.
    pub id: PresetId,
    /// Owner identity.
    pub owner: UserId,
    /// Master or personal.
    pub visibility: PresetVisibility,
    /// The preset payload itself.
    pub preset: GearPreset,
    /// Free-form metadata, passed through opaquely.
    pub metadata: Option<serde_json::Value>,
    /// When the preset was saved.
    pub created_at: DateTime<Utc>,
}

/// In-memory catalog of saved presets.
#[derive(Clone, Debug, Default)]
pub struct PresetLibrary {
    entries: Vec<SavedPreset>,
}

impl PresetLibrary {
    /// Create an empty library.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Save a preset and return its id.
    pub fn save(
        &mut self,
        owner: UserId,
        visibility: PresetVisibility,
        preset: GearPreset,
        metadata: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> PresetId {
        let id = PresetId::new();
        self.entries.push(SavedPreset {
            id,
            owner,
            visibility,
            preset,
            metadata,
            created_at: now,
        });
        id
    }

    /// Look up a preset the caller is allowed to see.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::NotFound`] both for absent presets and for
    /// personal presets of another owner — the two are indistinguishable.
    pub fn get(&self, id: PresetId, caller: &UserId) -> Result<&SavedPreset, AdmissionError> {
        self.entries
            .iter()
            .find(|entry| entry.id == id && Self::visible_to(entry, caller))
            .ok_or(AdmissionError::NotFound)
    }

    /// Replace the payload of an owned preset.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotFound`] if the preset does not exist.
    /// - [`AdmissionError::NotAuthorized`] if the caller is not the owner.
    pub fn update(
        &mut self,
        id: PresetId,
        caller: &UserId,
        preset: GearPreset,
    ) -> Result<(), AdmissionError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(AdmissionError::NotFound)?;
        if entry.owner != *caller {
            return Err(AdmissionError::NotAuthorized);
        }
        entry.preset = preset;
        Ok(())
    }

    /// All presets visible to the caller: master presets plus their own.
    pub fn visible(&self, caller: &UserId) -> impl Iterator<Item = &SavedPreset> {
        self.entries
            .iter()
            .filter(move |entry| Self::visible_to(entry, caller))
    }

    fn visible_to(entry: &SavedPreset, caller: &UserId) -> bool {
        entry.visibility == PresetVisibility::Master || entry.owner == *caller
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::preset::tests_support::minimal_preset;

    #[test]
    fn personal_presets_are_owner_only() {
        let mut library = PresetLibrary::new();
        let id = library.save(
            UserId::from("alice"),
            PresetVisibility::Personal,
            minimal_preset("bow"),
            None,
            Utc::now(),
        );

        assert!(library.get(id, &UserId::from("alice")).is_ok());
        assert_eq!(
            library.get(id, &UserId::from("bob")).unwrap_err(),
            AdmissionError::NotFound
        );
    }

    #[test]
    fn master_presets_are_visible_to_everyone() {
        let mut library = PresetLibrary::new();
        library.save(
            UserId::from("officer"),
            PresetVisibility::Master,
            minimal_preset("mace"),
            None,
            Utc::now(),
        );
        library.save(
            UserId::from("alice"),
            PresetVisibility::Personal,
            minimal_preset("bow"),
            None,
            Utc::now(),
        );

        assert_eq!(library.visible(&UserId::from("bob")).count(), 1);
        assert_eq!(library.visible(&UserId::from("alice")).count(), 2);
    }

    #[test]
    fn update_requires_ownership() {
        let mut library = PresetLibrary::new();
        let id = library.save(
            UserId::from("alice"),
            PresetVisibility::Personal,
            minimal_preset("bow"),
            None,
            Utc::now(),
        );

        let err = library
            .update(id, &UserId::from("bob"), minimal_preset("sword"))
            .unwrap_err();
        assert_eq!(err, AdmissionError::NotAuthorized);

        library
            .update(id, &UserId::from("alice"), minimal_preset("sword"))
            .unwrap();
        assert_eq!(
            library
                .get(id, &UserId::from("alice"))
                .unwrap()
                .preset
                .weapon
                .line,
            "sword"
        );
    }
}
