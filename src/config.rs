//! Run configuration.
//!
//! A `Settings` value is built once (by the CLI or a test) and passed by
//! reference into pipelines and executors. There is no process-wide mutable
//! state; anything a component needs it receives explicitly.

use std::env;
use std::path::PathBuf;

/// Immutable configuration for a batch run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the SimulationCraft binary.
    pub executable: PathBuf,

    /// Thread count handed to the simulator (`threads=` line).
    pub threads: String,

    /// Fight styles to generate reports for (e.g. "patchwerk", "hecticaddcleave").
    pub fight_styles: Vec<String>,

    /// Iteration cap per profile.
    pub iterations: String,

    /// Target error percentage; the simulator stops early once reached.
    pub target_error: String,

    /// Simulate against PTR game data.
    pub ptr: bool,

    /// Let the simulator fall back to default action priority lists.
    pub default_actions: bool,

    /// Content tier used to select baseline profiles (e.g. "T27").
    pub tier: String,

    /// Directory the JSON reports are written under.
    pub output_dir: PathBuf,

    /// Directory baseline character profiles are loaded from.
    pub profiles_dir: PathBuf,

    /// Directory for request/result artifacts during execution.
    pub temp_dir: PathBuf,

    /// Keep request/result artifacts after a successful run (debugging).
    pub keep_files: bool,

    /// Remote execution backend; `None` runs the simulator locally.
    pub remote: Option<RemoteSettings>,
}

/// Settings for the remote HTTP job queue backend.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// API key sent with job submissions.
    pub api_key: String,
    /// Thread hint forwarded to the remote workers.
    pub threads: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("simc"),
            threads: "8".to_string(),
            fight_styles: vec!["patchwerk".to_string()],
            iterations: "60000".to_string(),
            target_error: "0.1".to_string(),
            ptr: false,
            default_actions: false,
            tier: "T27".to_string(),
            output_dir: PathBuf::from("results"),
            profiles_dir: PathBuf::from("profiles"),
            temp_dir: env::temp_dir(),
            keep_files: false,
            remote: None,
        }
    }
}

impl Settings {
    /// Quick settings for smoke-testing against a local binary.
    pub fn quick(executable: PathBuf) -> Self {
        Self {
            executable,
            iterations: "5000".to_string(),
            target_error: "1.0".to_string(),
            ..Default::default()
        }
    }
}
