//! Gear preset payload shape and the pure preset validator.
//!
//! A preset arrives from the transport layer as a structured mapping. The
//! engine only inspects the fields named by a slot's requirements; unknown
//! keys round-trip untouched through [`GearPreset::extra`].
//!
//! Validation is a pure function with no shared state: it either passes or
//! returns a [`ValidationError`] with a stable reason tag. It never strips
//! or rewrites fields.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Weapon lines
// ============================================================================

/// The known weapon line enumeration.
///
/// A preset declaring a line outside this set is structurally malformed and
/// rejected with `unknown_weapon_line`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponLine {
    /// Sword line.
    Sword,
    /// Axe line.
    Axe,
    /// Mace line.
    Mace,
    /// Hammer line.
    Hammer,
    /// War gloves line.
    WarGloves,
    /// Crossbow line.
    Crossbow,
    /// Bow line.
    Bow,
    /// Spear line.
    Spear,
    /// Dagger line.
    Dagger,
    /// Quarterstaff line.
    Quarterstaff,
    /// Nature staff line.
    NatureStaff,
    /// Fire staff line.
    FireStaff,
    /// Frost staff line.
    FrostStaff,
    /// Arcane staff line.
    ArcaneStaff,
    /// Holy staff line.
    HolyStaff,
    /// Cursed staff line.
    CursedStaff,
}

impl WeaponLine {
    /// Canonical snake_case name, as it appears in preset payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sword => "sword",
            Self::Axe => "axe",
            Self::Mace => "mace",
            Self::Hammer => "hammer",
            Self::WarGloves => "war_gloves",
            Self::Crossbow => "crossbow",
            Self::Bow => "bow",
            Self::Spear => "spear",
            Self::Dagger => "dagger",
            Self::Quarterstaff => "quarterstaff",
            Self::NatureStaff => "nature_staff",
            Self::FireStaff => "fire_staff",
            Self::FrostStaff => "frost_staff",
            Self::ArcaneStaff => "arcane_staff",
            Self::HolyStaff => "holy_staff",
            Self::CursedStaff => "cursed_staff",
        }
    }
}

impl fmt::Display for WeaponLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a weapon line name is not in the known enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWeaponLine(pub String);

impl FromStr for WeaponLine {
    type Err = UnknownWeaponLine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sword" => Ok(Self::Sword),
            "axe" => Ok(Self::Axe),
            "mace" => Ok(Self::Mace),
            "hammer" => Ok(Self::Hammer),
            "war_gloves" => Ok(Self::WarGloves),
            "crossbow" => Ok(Self::Crossbow),
            "bow" => Ok(Self::Bow),
            "spear" => Ok(Self::Spear),
            "dagger" => Ok(Self::Dagger),
            "quarterstaff" => Ok(Self::Quarterstaff),
            "nature_staff" => Ok(Self::NatureStaff),
            "fire_staff" => Ok(Self::FireStaff),
            "frost_staff" => Ok(Self::FrostStaff),
            "arcane_staff" => Ok(Self::ArcaneStaff),
            "holy_staff" => Ok(Self::HolyStaff),
            "cursed_staff" => Ok(Self::CursedStaff),
            other => Err(UnknownWeaponLine(other.to_string())),
        }
    }
}

// ============================================================================
// Preset payload
// ============================================================================

/// One equipment piece: a type name and a tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Item type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Item tier.
    pub tier: u8,
}

/// The weapon section of a preset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Weapon line name; must parse into [`WeaponLine`].
    pub line: String,
    /// Concrete item within the line.
    pub item: String,
    /// Item tier.
    pub tier: u8,
}

/// The armor section of a preset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorSpec {
    /// Head piece.
    pub helmet: Piece,
    /// Chest piece.
    pub chest: Piece,
    /// Boot piece.
    pub boots: Piece,
}

/// The consumables section of a preset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumables {
    /// Food item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<String>,
    /// Potion item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potion: Option<String>,
}

/// A submitted gear preset.
///
/// Fields outside the named shape are preserved in [`extra`](Self::extra) and
/// passed through untouched — the engine never inspects or strips them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GearPreset {
    /// Declared role, e.g. `"tank"`.
    pub role: String,
    /// Weapon section.
    pub weapon: WeaponSpec,
    /// Armor section.
    pub armor: ArmorSpec,
    /// Offhand piece, if the build carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offhand: Option<Piece>,
    /// Consumables section.
    #[serde(default)]
    pub consumables: Consumables,
    /// Mount item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    /// Item power the build is expected to reach.
    pub ip_target: u32,
    /// Unknown keys, passed through opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Slot requirements
// ============================================================================

/// Preset fields a slot may require to be present and non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetField {
    /// An offhand piece must be equipped.
    Offhand,
    /// A mount must be declared.
    Mount,
    /// Food must be declared.
    Food,
    /// A potion must be declared.
    Potion,
}

/// Equipment requirements attached to a slot.
///
/// Empty requirements accept any well-formed preset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequirements {
    /// Minimum item power the preset must target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ip: Option<u32>,
    /// Weapon lines admitted into this slot. Empty means any known line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weapon_lines: Vec<WeaponLine>,
    /// Fields that must be present and non-empty in the preset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<PresetField>,
}

impl SlotRequirements {
    /// Whether this slot constrains submitted presets at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_ip.is_none() && self.weapon_lines.is_empty() && self.required_fields.is_empty()
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Validate a preset against a slot's requirements.
///
/// Checks, in order: structural well-formedness (non-empty role, weapon line
/// in the known enumeration), weapon line admitted by the slot, item power
/// target against `min_ip`, and presence of every required field.
///
/// # Errors
///
/// Returns a [`ValidationError`] with one of the stable reason tags:
/// `missing_role`, `unknown_weapon_line`, `weapon_line_not_allowed`,
/// `ip_below_minimum`, `missing_offhand`, `missing_mount`, `missing_food`,
/// `missing_potion`.
pub fn validate(preset: &GearPreset, requirements: &SlotRequirements) -> Result<(), ValidationError> {
    if preset.role.trim().is_empty() {
        return Err(ValidationError::new("missing_role"));
    }

    let line: WeaponLine = preset
        .weapon
        .line
        .parse()
        .map_err(|_| ValidationError::new("unknown_weapon_line"))?;

    if !requirements.weapon_lines.is_empty() && !requirements.weapon_lines.contains(&line) {
        return Err(ValidationError::new("weapon_line_not_allowed"));
    }

    if let Some(min_ip) = requirements.min_ip {
        if preset.ip_target < min_ip {
            return Err(ValidationError::new("ip_below_minimum"));
        }
    }

    for field in &requirements.required_fields {
        check_required_field(preset, *field)?;
    }

    Ok(())
}

fn check_required_field(preset: &GearPreset, field: PresetField) -> Result<(), ValidationError> {
    let present = match field {
        PresetField::Offhand => preset
            .offhand
            .as_ref()
            .is_some_and(|p| !p.kind.trim().is_empty()),
        PresetField::Mount => preset.mount.as_ref().is_some_and(|m| !m.trim().is_empty()),
        PresetField::Food => preset
            .consumables
            .food
            .as_ref()
            .is_some_and(|f| !f.trim().is_empty()),
        PresetField::Potion => preset
            .consumables
            .potion
            .as_ref()
            .is_some_and(|p| !p.trim().is_empty()),
    };

    if present {
        Ok(())
    } else {
        let reason = match field {
            PresetField::Offhand => "missing_offhand",
            PresetField::Mount => "missing_mount",
            PresetField::Food => "missing_food",
            PresetField::Potion => "missing_potion",
        };
        Err(ValidationError::new(reason))
    }
}
