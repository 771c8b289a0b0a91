//! Race comparison chart: one profile per playable race.

use crate::config::Settings;
use crate::error::SimError;
use crate::gamedata::{race_display_name, races_for_class};
use crate::pipeline::{encode_name, Pipeline};
use crate::report::Report;
use crate::simulation::{SimBatch, SimProfile};

pub struct RacesPipeline;

impl Pipeline for RacesPipeline {
    fn key(&self) -> &'static str {
        "races"
    }

    fn title(&self) -> &'static str {
        "Races"
    }

    // Every race is a ranked contender; there is no baseline entry.
    fn ignored_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn add_simulation_data(
        &self,
        batch: &mut SimBatch,
        report: &Report,
        settings: &Settings,
    ) -> Result<(), SimError> {
        let seed = report.profile.clone().ok_or_else(|| {
            SimError::Config("races pipeline needs a character profile".to_string())
        })?;
        let class = seed.character.class.clone();
        let fight_style = report.simc_settings.fight_style.clone();

        for (index, race) in races_for_class(&class).iter().enumerate() {
            let name = encode_name(self.split_char(), &[&race_display_name(race)])?;
            let mut profile = SimProfile::new(name, settings, &fight_style);
            if index == 0 {
                profile = profile.with_base_profile(seed.clone())?;
            }
            profile = profile.with_argument(format!("race={}", race));
            batch.add(profile)?;
        }
        Ok(())
    }

    fn post_processing(&self, report: &mut Report) -> Result<(), SimError> {
        report.compute_rankings(&self.ignored_keys());
        for display in report.sorted_data_keys.clone() {
            let token = display
                .to_lowercase()
                .replace([' ', '\''], "_")
                .replace("__", "_");
            report.translations.insert(display, token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::report::Report;

    fn seed() -> crate::character::CharacterProfile {
        serde_json::from_str(
            r#"{
                "character": {"class": "shaman", "spec": "elemental"},
                "items": {"head": {"id": "171382"}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_one_profile_per_race_with_seed_on_first() {
        let settings = Settings::default();
        let report = Report::new("Races", "test", &settings, "patchwerk", Some(seed()));
        let mut batch = SimBatch::new("races_test", &settings);
        RacesPipeline
            .add_simulation_data(&mut batch, &report, &settings)
            .unwrap();

        assert_eq!(batch.profiles.len(), races_for_class("shaman").len());
        assert!(batch.profiles[0].base_profile.is_some());
        for profile in &batch.profiles[1..] {
            assert!(profile.base_profile.is_none());
        }
        for profile in &batch.profiles {
            assert!(profile
                .extra_arguments
                .iter()
                .any(|arg| arg.starts_with("race=")));
        }
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let settings = Settings::default();
        let report = Report::new("Races", "test", &settings, "patchwerk", None);
        let mut batch = SimBatch::new("races_test", &settings);
        assert!(matches!(
            RacesPipeline.add_simulation_data(&mut batch, &report, &settings),
            Err(SimError::Config(_))
        ));
    }
}
