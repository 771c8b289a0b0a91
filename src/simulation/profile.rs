//! A single named simulation request.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::character::CharacterProfile;
use crate::config::Settings;
use crate::error::ProfileError;

/// One named simulation request: a character build variant plus the combat
/// parameters it runs under. The name doubles as the demultiplexing key for
/// results, so it must be unique within a batch.
#[derive(Debug, Clone)]
pub struct SimProfile {
    pub name: String,
    pub fight_style: String,
    pub iterations: String,
    pub target_error: String,
    pub ptr: bool,
    pub default_actions: bool,
    /// Raw simulator directives, in order. For the batch baseline these are
    /// written as full profile lines; for later profiles as profileset deltas.
    pub extra_arguments: Vec<String>,
    pub base_profile: Option<CharacterProfile>,
    pub executable: PathBuf,
    pub created: DateTime<Utc>,

    dps: Option<i64>,
    /// Whether the result came from an alternate execution path. Diagnostic
    /// only.
    external: bool,
    raw_output: Option<String>,
    started: Option<DateTime<Utc>>,
    finished: Option<DateTime<Utc>>,
}

impl SimProfile {
    /// New profile carrying the shared combat parameters from `settings` with
    /// the per-run fight style. No result state.
    pub fn new(name: impl Into<String>, settings: &Settings, fight_style: &str) -> Self {
        Self {
            name: name.into(),
            fight_style: fight_style.to_string(),
            iterations: settings.iterations.clone(),
            target_error: settings.target_error.clone(),
            ptr: settings.ptr,
            default_actions: settings.default_actions,
            extra_arguments: Vec::new(),
            base_profile: None,
            executable: settings.executable.clone(),
            created: Utc::now(),
            dps: None,
            external: false,
            raw_output: None,
            started: None,
            finished: None,
        }
    }

    /// Attach a raw simulator directive.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.extra_arguments.push(argument.into());
        self
    }

    /// Attach a seed character profile. Rejected if the profile is missing
    /// its character or items section.
    pub fn with_base_profile(mut self, profile: CharacterProfile) -> Result<Self, ProfileError> {
        profile.validate(&self.name)?;
        self.base_profile = Some(profile);
        Ok(self)
    }

    /// Record the profile's score. Fractional DPS is truncated to an integer.
    /// Write-once: a second call without clearing is a contract violation.
    pub fn set_dps(&mut self, value: f64, external: bool) -> Result<(), ProfileError> {
        if self.dps.is_some() {
            return Err(ProfileError::AlreadySet(self.name.clone()));
        }
        self.dps = Some(value as i64);
        self.external = external;
        Ok(())
    }

    /// The recorded score. Errors if the profile is mid-simulation or never
    /// received a result.
    pub fn dps(&self) -> Result<i64, ProfileError> {
        if self.started.is_some() && self.finished.is_none() {
            return Err(ProfileError::StillInProgress(self.name.clone()));
        }
        self.dps.ok_or_else(|| ProfileError::NotSet(self.name.clone()))
    }

    /// Whether the score came from an alternate execution path.
    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    pub fn set_raw_output(&mut self, output: String) {
        self.raw_output = Some(output);
    }

    /// Mark execution start. Called by the runner, not by pipeline code.
    pub fn mark_started(&mut self) {
        self.started = Some(Utc::now());
    }

    /// Mark execution end.
    pub fn mark_finished(&mut self) {
        self.finished = Some(Utc::now());
    }

    /// Wall-clock execution time, once both timestamps exist.
    pub fn duration(&self) -> Result<Duration, ProfileError> {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => Ok(end - start),
            _ => Err(ProfileError::MissingTimings(self.name.clone())),
        }
    }

    /// An independent sibling with identical settings and arguments but no
    /// result state. Used to derive variants without re-building base
    /// arguments.
    pub fn copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            fight_style: self.fight_style.clone(),
            iterations: self.iterations.clone(),
            target_error: self.target_error.clone(),
            ptr: self.ptr,
            default_actions: self.default_actions,
            extra_arguments: self.extra_arguments.clone(),
            base_profile: self.base_profile.clone(),
            executable: self.executable.clone(),
            created: Utc::now(),
            dps: None,
            external: false,
            raw_output: None,
            started: None,
            finished: None,
        }
    }

    /// Whether `other` agrees on every base combat parameter. This is the
    /// batch coherence predicate; the profileset mechanism can only vary
    /// per-profile arguments, never these. New base parameters must be added
    /// here and nowhere else.
    pub fn is_equal_base(&self, other: &SimProfile) -> bool {
        self.fight_style == other.fight_style
            && self.iterations == other.iterations
            && self.target_error == other.target_error
            && self.ptr == other.ptr
            && self.default_actions == other.default_actions
            && self.executable == other.executable
    }

    /// The global `key=value` settings shared by every profile in a batch.
    pub fn global_arguments(&self) -> Vec<String> {
        vec![
            format!("fight_style={}", self.fight_style),
            format!("iterations={}", self.iterations),
            format!("target_error={}", self.target_error),
            format!("ptr={}", if self.ptr { 1 } else { 0 }),
            format!(
                "default_actions={}",
                if self.default_actions { 1 } else { 0 }
            ),
        ]
    }

    /// Full argument list for the single-profile path: scalar settings, then
    /// the flattened base profile, then the raw directives.
    pub fn command_arguments(&self) -> Vec<String> {
        let mut args = self.global_arguments();
        if let Some(profile) = &self.base_profile {
            args.extend(profile.to_arguments(&self.name));
        }
        args.extend(self.extra_arguments.iter().cloned());
        args
    }
}
