//! Error types for the simulation engine.
//!
//! Two families: `ProfileError` covers programming-contract violations on a
//! single simulation profile (never retried), `SimError` covers everything
//! that can go wrong while building or executing a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Contract violations on a [`SimProfile`](crate::simulation::SimProfile).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// `set_dps` was called on a profile that already carries a result.
    #[error("dps for profile '{0}' has already been set")]
    AlreadySet(String),

    /// `dps()` was called before any result was recorded.
    #[error("dps for profile '{0}' has not been set")]
    NotSet(String),

    /// `dps()` was called while the profile is mid-simulation.
    #[error("profile '{0}' is still being simulated")]
    StillInProgress(String),

    /// Duration requested before both start and end timestamps exist.
    #[error("timings for profile '{0}' are incomplete")]
    MissingTimings(String),

    /// A base character profile is missing its character or items section.
    #[error("base profile for '{name}' is incomplete: {reason}")]
    IncompleteBaseProfile { name: String, reason: String },

    /// A human-chosen name component contains the hierarchy split character,
    /// which would make the encoded name ambiguous to decode.
    #[error("name component '{component}' contains reserved character '{split}'")]
    ReservedCharacter { component: String, split: char },
}

/// Failures while constructing or executing simulations.
#[derive(Debug, Error)]
pub enum SimError {
    /// The simulator binary does not exist. Fatal, never retried.
    #[error("simulation executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// The simulator ran but never exited cleanly within the retry budget.
    /// The transcript path points at the preserved request artifact with the
    /// failure output appended.
    #[error("simulation '{name}' failed after {attempts} attempts (transcript: {transcript})")]
    SimulationFailed {
        name: String,
        attempts: u32,
        transcript: PathBuf,
    },

    /// A remote job reported terminal failure. Diagnostics were persisted
    /// locally.
    #[error("remote job '{id}' failed (diagnostics: {transcript})")]
    RemoteJobFailed { id: String, transcript: PathBuf },

    /// The remote job never completed within the polling ceiling.
    #[error("timed out waiting for remote job '{id}' after {waited_secs}s")]
    PollTimeout { id: String, waited_secs: u64 },

    /// `simulate()` was called twice on the same batch.
    #[error("batch '{0}' has already been simulated")]
    AlreadySimulated(String),

    /// A profile's base combat parameters disagree with the batch baseline.
    #[error("profile '{profile}' does not share base parameters with batch '{batch}'")]
    BaseMismatch { batch: String, profile: String },

    /// The result JSON carried no entry for a profile in the batch.
    #[error("no result entry for profile '{0}'")]
    MissingResult(String),

    /// The result JSON parsed but lacked required structure.
    #[error("malformed simulation result: {0}")]
    MalformedResult(String),

    /// Bad caller-supplied configuration. Fail fast, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(Box<ureq::Error>),
}

// ureq::Error is large; box it so SimError stays reasonably sized.
impl From<ureq::Error> for SimError {
    fn from(err: ureq::Error) -> Self {
        SimError::Http(Box::new(err))
    }
}
