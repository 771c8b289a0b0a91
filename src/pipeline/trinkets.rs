//! Trinket comparison chart: every trinket at every obtainable item level,
//! against a trinketless baseline.

use serde_json::json;

use crate::character::Slot;
use crate::config::Settings;
use crate::error::SimError;
use crate::gamedata::trinkets_for_class;
use crate::pipeline::{encode_name, Pipeline};
use crate::report::Report;
use crate::simulation::{SimBatch, SimProfile};

pub struct TrinketsPipeline;

impl Pipeline for TrinketsPipeline {
    fn key(&self) -> &'static str {
        "trinkets"
    }

    fn title(&self) -> &'static str {
        "Trinkets"
    }

    /// Strip equipped trinkets from the seed so they never contaminate the
    /// baseline or the simulated variants.
    fn pre_processing(&self, report: &mut Report) -> Result<(), SimError> {
        if let Some(profile) = &mut report.profile {
            profile.items.remove(&Slot::Trinket1);
            profile.items.remove(&Slot::Trinket2);
        }
        Ok(())
    }

    fn add_simulation_data(
        &self,
        batch: &mut SimBatch,
        report: &Report,
        settings: &Settings,
    ) -> Result<(), SimError> {
        let seed = report.profile.clone().ok_or_else(|| {
            SimError::Config("trinkets pipeline needs a character profile".to_string())
        })?;
        let class = seed.character.class.clone();
        let fight_style = report.simc_settings.fight_style.clone();

        let trinkets = trinkets_for_class(&class);
        let floor = trinkets
            .iter()
            .map(|t| t.min_itemlevel)
            .min()
            .ok_or_else(|| {
                SimError::Config(format!("no trinkets available for class '{}'", class))
            })?;

        let baseline_name =
            encode_name(self.split_char(), &["baseline", &floor.to_string()])?;
        let baseline = SimProfile::new(baseline_name, settings, &fight_style)
            .with_base_profile(seed)?
            .with_argument("trinket1=")
            .with_argument("trinket2=");
        batch.add(baseline)?;

        for trinket in trinkets {
            for ilevel in trinket.itemlevels() {
                let name =
                    encode_name(self.split_char(), &[trinket.name, &ilevel.to_string()])?;
                let profile = SimProfile::new(name, settings, &fight_style).with_argument(
                    format!("trinket1=,id={},ilevel={}", trinket.id, ilevel),
                );
                batch.add(profile)?;
            }
        }
        Ok(())
    }

    fn post_processing(&self, report: &mut Report) -> Result<(), SimError> {
        report.compute_rankings(&self.ignored_keys());

        let mut item_ids = serde_json::Map::new();
        for trinket in crate::gamedata::TRINKETS {
            if report.data.contains_key(trinket.name) {
                report
                    .translations
                    .insert(trinket.name.to_string(), trinket.id.to_string());
                item_ids.insert(trinket.name.to_string(), json!(trinket.id));
            }
        }
        report
            .extra
            .insert("item_ids".to_string(), serde_json::Value::Object(item_ids));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterProfile;
    use crate::config::Settings;
    use crate::gamedata::TRINKETS;
    use crate::report::Report;

    fn seed() -> CharacterProfile {
        serde_json::from_str(
            r#"{
                "character": {"class": "shaman", "spec": "elemental"},
                "items": {
                    "head": {"id": "171382"},
                    "trinket1": {"id": "179350"},
                    "trinket2": {"id": "186428"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_pre_processing_strips_trinkets() {
        let settings = Settings::default();
        let mut report = Report::new("Trinkets", "test", &settings, "patchwerk", Some(seed()));
        TrinketsPipeline.pre_processing(&mut report).unwrap();

        let profile = report.profile.as_ref().unwrap();
        assert!(!profile.items.contains_key(&Slot::Trinket1));
        assert!(!profile.items.contains_key(&Slot::Trinket2));
        assert!(profile.items.contains_key(&Slot::Head));
    }

    #[test]
    fn test_baseline_then_full_grid() {
        let settings = Settings::default();
        let mut report = Report::new("Trinkets", "test", &settings, "patchwerk", Some(seed()));
        TrinketsPipeline.pre_processing(&mut report).unwrap();

        let mut batch = SimBatch::new("trinkets_test", &settings);
        TrinketsPipeline
            .add_simulation_data(&mut batch, &report, &settings)
            .unwrap();

        let expected: usize = 1 + TRINKETS.iter().map(|t| t.itemlevels().len()).sum::<usize>();
        assert_eq!(batch.profiles.len(), expected);

        let baseline = &batch.profiles[0];
        assert!(baseline.name.starts_with("baseline/"));
        assert!(baseline.base_profile.is_some());
        assert!(baseline
            .extra_arguments
            .contains(&"trinket1=".to_string()));
        assert!(baseline
            .extra_arguments
            .contains(&"trinket2=".to_string()));

        for profile in &batch.profiles[1..] {
            assert!(profile.base_profile.is_none());
            assert!(profile.name.contains('/'));
            assert!(profile
                .extra_arguments
                .iter()
                .any(|arg| arg.starts_with("trinket1=,id=")));
        }
    }
}
