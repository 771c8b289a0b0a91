//! Static game data: playable races per class and the current trinket pool.
//!
//! Kept as plain consts so a game patch is a one-file change.

/// Item level distance between simulated steps.
pub const ITEMLEVEL_STEP: u16 = 13;

/// Playable race tokens for `class`, in simulator input form.
pub fn races_for_class(class: &str) -> &'static [&'static str] {
    match class {
        "shaman" => &[
            "draenei",
            "dwarf",
            "pandaren_alliance",
            "goblin",
            "highmountain_tauren",
            "mag_har_orc",
            "orc",
            "pandaren_horde",
            "tauren",
            "troll",
            "vulpera",
            "zandalari_troll",
            "kul_tiran",
            "dark_iron_dwarf",
        ],
        "paladin" => &[
            "human",
            "dwarf",
            "draenei",
            "lightforged_draenei",
            "dark_iron_dwarf",
            "blood_elf",
            "tauren",
            "zandalari_troll",
        ],
        "druid" => &[
            "night_elf",
            "worgen",
            "kul_tiran",
            "tauren",
            "troll",
            "highmountain_tauren",
            "zandalari_troll",
        ],
        "demon_hunter" => &["night_elf", "blood_elf"],
        _ => &[
            "human",
            "dwarf",
            "night_elf",
            "gnome",
            "draenei",
            "worgen",
            "pandaren_alliance",
            "void_elf",
            "lightforged_draenei",
            "dark_iron_dwarf",
            "kul_tiran",
            "mechagnome",
            "orc",
            "undead",
            "tauren",
            "troll",
            "blood_elf",
            "goblin",
            "pandaren_horde",
            "nightborne",
            "highmountain_tauren",
            "mag_har_orc",
            "zandalari_troll",
            "vulpera",
        ],
    }
}

/// Human-readable name for a race token, e.g. "mag_har_orc" becomes
/// "Mag'har Orc".
pub fn race_display_name(token: &str) -> String {
    token
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let rest: String = chars.collect();
                    format!("{}{}", first.to_uppercase(), rest)
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .replace("Mag Har", "Mag'har")
}

/// One simulable trinket with its obtainable item level range.
#[derive(Debug, Clone, Copy)]
pub struct Trinket {
    pub name: &'static str,
    pub id: &'static str,
    pub min_itemlevel: u16,
    pub max_itemlevel: u16,
    /// Restricted to these class tokens; `None` means any class.
    pub classes: Option<&'static [&'static str]>,
}

impl Trinket {
    /// Item levels to simulate: every step from min to max, always including
    /// the max itself.
    pub fn itemlevels(&self) -> Vec<u16> {
        let mut levels: Vec<u16> = (self.min_itemlevel..=self.max_itemlevel)
            .step_by(ITEMLEVEL_STEP as usize)
            .collect();
        if levels.last() != Some(&self.max_itemlevel) {
            levels.push(self.max_itemlevel);
        }
        levels
    }
}

/// The current trinket pool.
pub const TRINKETS: &[Trinket] = &[
    Trinket {
        name: "Inscrutable Quantum Device",
        id: "179350",
        min_itemlevel: 213,
        max_itemlevel: 278,
        classes: None,
    },
    Trinket {
        name: "Shadowed Orb of Torment",
        id: "186428",
        min_itemlevel: 226,
        max_itemlevel: 278,
        classes: None,
    },
    Trinket {
        name: "The First Sigil",
        id: "188271",
        min_itemlevel: 239,
        max_itemlevel: 291,
        classes: None,
    },
    Trinket {
        name: "Soleah's Secret Technique",
        id: "190958",
        min_itemlevel: 226,
        max_itemlevel: 278,
        classes: None,
    },
    Trinket {
        name: "Elegy of the Eternals",
        id: "188270",
        min_itemlevel: 239,
        max_itemlevel: 291,
        classes: None,
    },
    Trinket {
        name: "Bells of the Endless Feast",
        id: "188252",
        min_itemlevel: 239,
        max_itemlevel: 291,
        classes: None,
    },
];

/// Trinkets simulable by `class`.
pub fn trinkets_for_class(class: &str) -> Vec<&'static Trinket> {
    TRINKETS
        .iter()
        .filter(|t| match t.classes {
            Some(classes) => classes.contains(&class),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itemlevels_cover_the_range() {
        for trinket in TRINKETS {
            let levels = trinket.itemlevels();
            assert_eq!(levels.first(), Some(&trinket.min_itemlevel));
            assert_eq!(levels.last(), Some(&trinket.max_itemlevel));
            assert!(levels.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_race_display_names() {
        assert_eq!(race_display_name("orc"), "Orc");
        assert_eq!(race_display_name("night_elf"), "Night Elf");
        assert_eq!(race_display_name("mag_har_orc"), "Mag'har Orc");
        assert_eq!(race_display_name("zandalari_troll"), "Zandalari Troll");
    }

    #[test]
    fn test_every_class_has_races_and_trinkets() {
        for class in ["shaman", "paladin", "druid", "demon_hunter", "mage"] {
            assert!(!races_for_class(class).is_empty());
            assert!(!trinkets_for_class(class).is_empty());
        }
    }
}
