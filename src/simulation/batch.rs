//! Ordered collections of simulation profiles sharing base parameters.
//!
//! A batch is serialized into one profileset request: the first profile is
//! written as a complete profile (the baseline), every later profile as
//! argument deltas against it. Insertion order is load-bearing for the
//! baseline choice; result demultiplexing is by name, not position.

use std::collections::HashMap;
use std::path::PathBuf;

use log::warn;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::SimError;
use crate::simulation::executor::Executor;
use crate::simulation::profile::SimProfile;
use crate::simulation::result::SimcResult;

/// A group of profiles simulated in one external-tool invocation.
#[derive(Debug)]
pub struct SimBatch {
    pub name: String,
    /// Insertion order is significant: the first profile is the baseline.
    pub profiles: Vec<SimProfile>,
    /// Thread count for local execution.
    pub threads: String,
    /// Thread hint forwarded to remote workers, when configured.
    pub remote_threads: Option<String>,
    pub executable: PathBuf,
    /// Build hash of the tool that produced the results, once simulated.
    pub simc_hash: Option<String>,

    simulated: bool,
    run_id: Uuid,
}

impl SimBatch {
    /// New empty batch bound to the shared combat settings.
    pub fn new(name: impl Into<String>, settings: &Settings) -> Self {
        Self {
            name: name.into(),
            profiles: Vec::new(),
            threads: settings.threads.clone(),
            remote_threads: settings.remote.as_ref().map(|r| r.threads.clone()),
            executable: settings.executable.clone(),
            simc_hash: None,
            simulated: false,
            run_id: Uuid::new_v4(),
        }
    }

    /// Pre-seeded batch; fails fast when the profiles disagree on base
    /// parameters.
    pub fn with_profiles(
        name: impl Into<String>,
        profiles: Vec<SimProfile>,
        settings: &Settings,
    ) -> Result<Self, SimError> {
        let mut batch = Self::new(name, settings);
        batch.profiles = profiles;
        batch.selfcheck()?;
        Ok(batch)
    }

    /// Append a profile. Rejected when its base combat parameters disagree
    /// with the baseline's.
    pub fn add(&mut self, profile: SimProfile) -> Result<(), SimError> {
        if let Some(first) = self.profiles.first() {
            if !first.is_equal_base(&profile) {
                return Err(SimError::BaseMismatch {
                    batch: self.name.clone(),
                    profile: profile.name,
                });
            }
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Re-verify coherence across all profiles. Useful after direct mutation
    /// of `profiles`.
    pub fn selfcheck(&self) -> Result<(), SimError> {
        let Some(first) = self.profiles.first() else {
            return Ok(());
        };
        for profile in &self.profiles[1..] {
            if !first.is_equal_base(profile) {
                return Err(SimError::BaseMismatch {
                    batch: self.name.clone(),
                    profile: profile.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// The baseline profile, once any profile was added.
    pub fn baseline(&self) -> Option<&SimProfile> {
        self.profiles.first()
    }

    /// Unique stem for this batch's request/result artifacts. Bound to the
    /// batch instance, which is why `simulate()` is single-shot.
    pub fn file_stem(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", slug, self.run_id.simple())
    }

    /// Serialize the batch into the profileset request format: global
    /// settings, the baseline's raw lines, `name="<baseline>"`, then one
    /// `profileset."<name>"+=<arg>` line per delta argument.
    pub fn request_text(&self) -> Result<String, SimError> {
        let baseline = self.baseline().ok_or_else(|| {
            SimError::Config(format!("batch '{}' has no profiles to serialize", self.name))
        })?;

        let mut lines = vec![format!("threads={}", self.threads)];
        lines.extend(baseline.global_arguments());

        if let Some(profile) = &baseline.base_profile {
            lines.extend(profile.to_arguments(&baseline.name));
        }
        lines.extend(baseline.extra_arguments.iter().cloned());
        lines.push(format!("name=\"{}\"", baseline.name));

        for profile in &self.profiles[1..] {
            for argument in &profile.extra_arguments {
                lines.push(format!("profileset.\"{}\"+={}", profile.name, argument));
            }
        }

        lines.push(String::new());
        Ok(lines.join("\n"))
    }

    /// Distribute a parsed result onto the profiles. The baseline takes the
    /// first actor's mean; every other profile is matched against the
    /// profileset entries by exact name.
    pub fn apply_result(&mut self, result: &SimcResult) -> Result<(), SimError> {
        self.simc_hash = result.git_revision.clone();

        let player = result
            .sim
            .players
            .first()
            .ok_or_else(|| SimError::MalformedResult("result carries no players".to_string()))?;

        let mut by_name: HashMap<&str, f64> = HashMap::new();
        if let Some(sets) = &result.sim.profilesets {
            for entry in &sets.results {
                by_name.insert(entry.name.as_str(), entry.mean);
            }
        }

        let mut profiles = self.profiles.iter_mut();
        if let Some(baseline) = profiles.next() {
            if player.name != baseline.name {
                warn!(
                    "baseline actor '{}' does not match profile '{}'",
                    player.name, baseline.name
                );
            }
            baseline.set_dps(player.collected_data.dps.mean, false)?;
            baseline.mark_finished();
        }
        for profile in profiles {
            let mean = by_name
                .get(profile.name.as_str())
                .copied()
                .ok_or_else(|| SimError::MissingResult(profile.name.clone()))?;
            profile.set_dps(mean, false)?;
            profile.mark_finished();
        }
        Ok(())
    }

    pub(crate) fn mark_all_started(&mut self) {
        for profile in &mut self.profiles {
            profile.mark_started();
        }
    }

    /// Execute the batch through `executor`. Single-shot: the artifact names
    /// are bound to this instance, so a second call is an error. An empty
    /// batch returns `Ok(false)` so callers can skip silently; a lone profile
    /// short-circuits to the single-profile path with no request artifact.
    pub fn simulate(&mut self, executor: &dyn Executor) -> Result<bool, SimError> {
        if self.simulated {
            return Err(SimError::AlreadySimulated(self.name.clone()));
        }
        self.simulated = true;

        match self.profiles.len() {
            0 => {
                warn!("batch '{}' is empty, nothing to simulate", self.name);
                Ok(false)
            }
            1 => {
                if let Some(hash) = executor.run_single(&mut self.profiles[0])? {
                    self.simc_hash = Some(hash);
                }
                Ok(true)
            }
            _ => {
                self.selfcheck()?;
                // apply_result records the hash from the parsed result; the
                // executor's return value wins when both are present.
                if let Some(hash) = executor.run_batch(self)? {
                    self.simc_hash = Some(hash);
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileError;

    fn settings() -> Settings {
        Settings::default()
    }

    fn profile(name: &str, argument: &str) -> SimProfile {
        SimProfile::new(name, &settings(), "patchwerk").with_argument(argument)
    }

    /// Executor stub recording which path was taken.
    struct RecordingExecutor {
        batches: std::cell::Cell<u32>,
        singles: std::cell::Cell<u32>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                batches: std::cell::Cell::new(0),
                singles: std::cell::Cell::new(0),
            }
        }
    }

    impl Executor for RecordingExecutor {
        fn run_batch(&self, _batch: &mut SimBatch) -> Result<Option<String>, SimError> {
            self.batches.set(self.batches.get() + 1);
            Ok(None)
        }

        fn run_single(&self, profile: &mut SimProfile) -> Result<Option<String>, SimError> {
            self.singles.set(self.singles.get() + 1);
            profile.mark_started();
            profile.set_dps(1.0, false)?;
            profile.mark_finished();
            Ok(None)
        }
    }

    fn result_json(raw: &str) -> SimcResult {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_add_rejects_base_mismatch() {
        let mut batch = SimBatch::new("test", &settings());
        batch.add(profile("A", "x=1")).unwrap();

        let mut odd = profile("B", "x=2");
        odd.fight_style = "hecticaddcleave".to_string();
        assert!(matches!(
            batch.add(odd),
            Err(SimError::BaseMismatch { .. })
        ));
    }

    #[test]
    fn test_selfcheck_catches_post_construction_mutation() {
        let mut batch = SimBatch::with_profiles(
            "test",
            vec![profile("A", "x=1"), profile("B", "x=2")],
            &settings(),
        )
        .unwrap();
        assert!(batch.selfcheck().is_ok());

        batch.profiles[1].fight_style = "dungeonslice".to_string();
        assert!(matches!(
            batch.selfcheck(),
            Err(SimError::BaseMismatch { .. })
        ));
    }

    #[test]
    fn test_request_text_shape() {
        let mut batch = SimBatch::new("test", &settings());
        batch.add(profile("A", "x=1")).unwrap();
        batch.add(profile("B", "x=2")).unwrap();
        batch.add(profile("C", "y=3")).unwrap();

        let text = batch.request_text().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "threads=8");
        assert!(lines.contains(&"fight_style=patchwerk"));
        // Baseline raw argument, then the name binding, then deltas.
        let x1 = lines.iter().position(|l| *l == "x=1").unwrap();
        let name = lines.iter().position(|l| *l == "name=\"A\"").unwrap();
        assert!(x1 < name);
        assert!(lines.contains(&"profileset.\"B\"+=x=2"));
        assert!(lines.contains(&"profileset.\"C\"+=y=3"));
        // The baseline never appears as a profileset.
        assert!(!text.contains("profileset.\"A\""));
    }

    #[test]
    fn test_apply_result_demultiplexes_by_name() {
        let mut batch = SimBatch::new("test", &settings());
        batch.add(profile("A", "x=1")).unwrap();
        batch.add(profile("B", "x=2")).unwrap();
        batch.add(profile("C", "x=3")).unwrap();
        batch.add(profile("D", "x=4")).unwrap();

        // Shuffled relative to insertion order.
        let result = result_json(
            r#"{
                "git_revision": "deadbee",
                "sim": {
                    "players": [{"name": "A", "collected_data": {"dps": {"mean": 1000.0}}}],
                    "profilesets": {"results": [
                        {"name": "D", "mean": 1400.0},
                        {"name": "B", "mean": 1200.0},
                        {"name": "C", "mean": 1300.0}
                    ]}
                }
            }"#,
        );
        batch.apply_result(&result).unwrap();

        assert_eq!(batch.profiles[0].dps(), Ok(1000));
        assert_eq!(batch.profiles[1].dps(), Ok(1200));
        assert_eq!(batch.profiles[2].dps(), Ok(1300));
        assert_eq!(batch.profiles[3].dps(), Ok(1400));
        assert_eq!(batch.simc_hash.as_deref(), Some("deadbee"));
    }

    #[test]
    fn test_apply_result_missing_entry() {
        let mut batch = SimBatch::new("test", &settings());
        batch.add(profile("A", "x=1")).unwrap();
        batch.add(profile("B", "x=2")).unwrap();

        let result = result_json(
            r#"{"sim": {
                "players": [{"name": "A", "collected_data": {"dps": {"mean": 1000.0}}}],
                "profilesets": {"results": []}
            }}"#,
        );
        assert!(matches!(
            batch.apply_result(&result),
            Err(SimError::MissingResult(name)) if name == "B"
        ));
    }

    #[test]
    fn test_apply_result_twice_is_contract_error() {
        let mut batch = SimBatch::new("test", &settings());
        batch.add(profile("A", "x=1")).unwrap();
        let result = result_json(
            r#"{"sim": {"players": [{"name": "A", "collected_data": {"dps": {"mean": 10.0}}}]}}"#,
        );
        batch.apply_result(&result).unwrap();
        assert!(matches!(
            batch.apply_result(&result),
            Err(SimError::Profile(ProfileError::AlreadySet(_)))
        ));
    }

    #[test]
    fn test_empty_batch_simulate_returns_false() {
        let executor = RecordingExecutor::new();
        let mut batch = SimBatch::new("empty", &settings());
        assert_eq!(batch.simulate(&executor).unwrap(), false);
        assert_eq!(executor.batches.get(), 0);
        assert_eq!(executor.singles.get(), 0);
    }

    #[test]
    fn test_single_profile_bypasses_batch_path() {
        let executor = RecordingExecutor::new();
        let mut batch = SimBatch::new("solo", &settings());
        batch.add(profile("Only", "x=1")).unwrap();
        assert_eq!(batch.simulate(&executor).unwrap(), true);
        assert_eq!(executor.batches.get(), 0);
        assert_eq!(executor.singles.get(), 1);
        assert_eq!(batch.profiles[0].dps(), Ok(1));
    }

    #[test]
    fn test_simulate_twice_is_error() {
        let executor = RecordingExecutor::new();
        let mut batch = SimBatch::new("once", &settings());
        batch.add(profile("A", "x=1")).unwrap();
        batch.simulate(&executor).unwrap();
        assert!(matches!(
            batch.simulate(&executor),
            Err(SimError::AlreadySimulated(_))
        ));
    }

    #[test]
    fn test_file_stem_is_unique_per_instance() {
        let a = SimBatch::new("same name", &settings());
        let b = SimBatch::new("same name", &settings());
        assert_ne!(a.file_stem(), b.file_stem());
        assert!(a.file_stem().starts_with("same_name_"));
    }
}
