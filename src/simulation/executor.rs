//! Execution strategy seam.
//!
//! Batches and pipelines depend only on this trait; whether the simulator
//! runs as a local subprocess or behind a remote job queue is the
//! implementation's business.

use crate::error::SimError;
use crate::simulation::batch::SimBatch;
use crate::simulation::profile::SimProfile;

/// An execution backend for simulation requests.
///
/// Both methods return the simulator's build identifier when the backend can
/// report one, so callers can stamp results with provenance.
pub trait Executor {
    /// Run a full profileset batch (two or more profiles) and write the
    /// results back onto the batch's profiles.
    fn run_batch(&self, batch: &mut SimBatch) -> Result<Option<String>, SimError>;

    /// Run a lone profile without profileset overhead.
    fn run_single(&self, profile: &mut SimProfile) -> Result<Option<String>, SimError>;
}
