//! Chart pipelines.
//!
//! A pipeline turns a seed character profile into a batch of simulation
//! profiles, runs them through an executor and collects the scores into a
//! chart report. The trait's default methods implement the common shape
//! (decode hierarchical names, insert scores, compute rankings); concrete
//! pipelines mostly just enumerate their variants.

mod races;
mod trinkets;

use std::path::PathBuf;

use log::{info, warn};

pub use races::RacesPipeline;
pub use trinkets::TrinketsPipeline;

use crate::character::CharacterProfile;
use crate::config::Settings;
use crate::error::{ProfileError, SimError};
use crate::report::Report;
use crate::simulation::{Executor, SimBatch};

/// Default hierarchy separator in encoded profile names.
pub const DEFAULT_SPLIT_CHAR: char = '/';

/// Join name components with `split`, rejecting components that already
/// contain the separator (the encoded name would be ambiguous).
pub fn encode_name(split: char, components: &[&str]) -> Result<String, ProfileError> {
    for component in components {
        if component.contains(split) {
            return Err(ProfileError::ReservedCharacter {
                component: component.to_string(),
                split,
            });
        }
    }
    Ok(components.join(&split.to_string()))
}

/// A chart-generating simulation pipeline.
pub trait Pipeline {
    /// Stable identifier, used for CLI selection and output paths.
    fn key(&self) -> &'static str;

    /// Chart title.
    fn title(&self) -> &'static str;

    /// Hierarchy separator for this pipeline's profile names.
    fn split_char(&self) -> char {
        DEFAULT_SPLIT_CHAR
    }

    /// Data keys excluded from rankings.
    fn ignored_keys(&self) -> Vec<String> {
        vec!["baseline".to_string()]
    }

    /// Adjust the report (typically its seed profile) before profiles are
    /// generated.
    fn pre_processing(&self, _report: &mut Report) -> Result<(), SimError> {
        Ok(())
    }

    /// Populate the batch with this pipeline's simulation profiles.
    fn add_simulation_data(
        &self,
        batch: &mut SimBatch,
        report: &Report,
        settings: &Settings,
    ) -> Result<(), SimError>;

    /// Move scores from the simulated batch into the report, decoding each
    /// profile name into its hierarchy components.
    fn collect_data(&self, batch: &SimBatch, report: &mut Report) -> Result<(), SimError> {
        let split = self.split_char();
        for profile in &batch.profiles {
            let components: Vec<&str> = profile.name.split(split).collect();
            let dps = profile.dps()?;
            report.insert(&components, dps);
        }
        Ok(())
    }

    /// Finalize the report: rankings, translations, extras.
    fn post_processing(&self, report: &mut Report) -> Result<(), SimError> {
        report.compute_rankings(&self.ignored_keys());
        Ok(())
    }
}

/// Look up a pipeline by its key.
pub fn create_pipeline(key: &str) -> Option<Box<dyn Pipeline>> {
    match key {
        "races" => Some(Box::new(RacesPipeline)),
        "trinkets" => Some(Box::new(TrinketsPipeline)),
        _ => None,
    }
}

/// Keys of every registered pipeline.
pub fn pipeline_keys() -> &'static [&'static str] {
    &["races", "trinkets"]
}

/// Run one pipeline for one class/spec/fight-style combination and write the
/// report. Returns the report path, or `None` when the pipeline produced no
/// profiles.
pub fn run_pipeline(
    pipeline: &dyn Pipeline,
    wow_class: &str,
    wow_spec: &str,
    fight_style: &str,
    profile: CharacterProfile,
    settings: &Settings,
    executor: &dyn Executor,
) -> Result<Option<PathBuf>, SimError> {
    let subtitle = format!("{} {} | {}", wow_spec, wow_class, fight_style);
    let mut report = Report::new(
        pipeline.title(),
        subtitle,
        settings,
        fight_style,
        Some(profile),
    );
    pipeline.pre_processing(&mut report)?;

    let batch_name = format!(
        "{}_{}_{}_{}",
        pipeline.key(),
        wow_class,
        wow_spec,
        fight_style
    );
    let mut batch = SimBatch::new(batch_name, settings);
    pipeline.add_simulation_data(&mut batch, &report, settings)?;

    info!(
        "running pipeline '{}' for {} {} ({}, {} profiles)",
        pipeline.key(),
        wow_spec,
        wow_class,
        fight_style,
        batch.profiles.len()
    );
    if !batch.simulate(executor)? {
        warn!("pipeline '{}' produced no profiles, skipping", pipeline.key());
        return Ok(None);
    }
    report.simc_hash = batch.simc_hash.clone();

    pipeline.collect_data(&batch, &mut report)?;
    pipeline.post_processing(&mut report)?;

    let path = settings
        .output_dir
        .join(pipeline.key())
        .join(format!("{}_{}_{}.json", wow_class, wow_spec, fight_style).to_lowercase());
    report.write_to(&path)?;
    Ok(Some(path))
}
