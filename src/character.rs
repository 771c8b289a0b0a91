//! Typed character profiles.
//!
//! The profile documents consumed here are JSON of the shape
//! `{"character": {...}, "items": {"head": {...}, ...}}`. Character
//! attributes are a fixed struct with optional fields and items are keyed by
//! a closed slot enum, so a renamed or misspelled key fails at parse time
//! instead of producing a silently wrong simulator input.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, SimError};

/// A full character build: attributes plus equipped items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub character: CharacterSection,
    #[serde(default)]
    pub items: BTreeMap<Slot, Item>,
}

/// Character-level attributes. Everything but the class token is optional;
/// absent fields simply produce no simulator input line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterSection {
    /// Simulator class token, e.g. "shaman".
    #[serde(default)]
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soulbind: Option<String>,
}

/// Equipment slots the simulator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Head,
    Neck,
    Shoulders,
    Back,
    Chest,
    Wrists,
    Hands,
    Waist,
    Legs,
    Feet,
    Finger1,
    Finger2,
    Trinket1,
    Trinket2,
    MainHand,
    OffHand,
}

impl Slot {
    pub const ALL: [Slot; 16] = [
        Slot::Head,
        Slot::Neck,
        Slot::Shoulders,
        Slot::Back,
        Slot::Chest,
        Slot::Wrists,
        Slot::Hands,
        Slot::Waist,
        Slot::Legs,
        Slot::Feet,
        Slot::Finger1,
        Slot::Finger2,
        Slot::Trinket1,
        Slot::Trinket2,
        Slot::MainHand,
        Slot::OffHand,
    ];

    /// Simulator input name for this slot.
    pub fn simc_name(&self) -> &'static str {
        match self {
            Slot::Head => "head",
            Slot::Neck => "neck",
            Slot::Shoulders => "shoulders",
            Slot::Back => "back",
            Slot::Chest => "chest",
            Slot::Wrists => "wrists",
            Slot::Hands => "hands",
            Slot::Waist => "waist",
            Slot::Legs => "legs",
            Slot::Feet => "feet",
            Slot::Finger1 => "finger1",
            Slot::Finger2 => "finger2",
            Slot::Trinket1 => "trinket1",
            Slot::Trinket2 => "trinket2",
            Slot::MainHand => "main_hand",
            Slot::OffHand => "off_hand",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simc_name())
    }
}

/// Sparse item attributes; only present fields end up in the input line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gem_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilevel: Option<String>,
}

impl Item {
    /// Render the simulator input line for this item, e.g.
    /// `head=,id=171382,bonus_id=7187,ilevel=233`.
    pub fn to_argument(&self, slot: Slot) -> String {
        let mut line = format!("{}=", slot.simc_name());
        if let Some(id) = &self.id {
            line.push_str(&format!(",id={}", id));
        }
        if let Some(bonus_id) = &self.bonus_id {
            line.push_str(&format!(",bonus_id={}", bonus_id));
        }
        if let Some(enchant) = &self.enchant {
            line.push_str(&format!(",enchant={}", enchant));
        }
        if let Some(gem_id) = &self.gem_id {
            line.push_str(&format!(",gem_id={}", gem_id));
        }
        if let Some(ilevel) = &self.ilevel {
            line.push_str(&format!(",ilevel={}", ilevel));
        }
        line
    }
}

impl CharacterProfile {
    /// A profile can only seed a simulation if it has both a class and at
    /// least one equipped item; the engine cannot synthesize a valid request
    /// from partial data.
    pub fn validate(&self, owner: &str) -> Result<(), ProfileError> {
        if self.character.class.is_empty() {
            return Err(ProfileError::IncompleteBaseProfile {
                name: owner.to_string(),
                reason: "character section has no class".to_string(),
            });
        }
        if self.items.is_empty() {
            return Err(ProfileError::IncompleteBaseProfile {
                name: owner.to_string(),
                reason: "items section is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Flatten the profile into simulator input lines. The first line names
    /// the actor: `shaman="profile_name"`.
    pub fn to_arguments(&self, profile_name: &str) -> Vec<String> {
        let c = &self.character;
        let mut args = vec![format!("{}=\"{}\"", c.class, profile_name)];

        let scalars = [
            ("level", &c.level),
            ("race", &c.race),
            ("spec", &c.spec),
            ("role", &c.role),
            ("position", &c.position),
            ("talents", &c.talents),
            ("covenant", &c.covenant),
            ("soulbind", &c.soulbind),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                args.push(format!("{}={}", key, value));
            }
        }

        for (slot, item) in &self.items {
            args.push(item.to_argument(*slot));
        }
        args
    }
}

/// Load a character profile document from a JSON file.
pub fn load_profile(path: &Path) -> Result<CharacterProfile, SimError> {
    let raw = fs::read_to_string(path)?;
    let profile: CharacterProfile = serde_json::from_str(&raw)?;
    Ok(profile)
}
