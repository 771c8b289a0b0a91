//! Batch simulation engine: profiles, batches, execution backends and the
//! retry machinery shared between them.

mod batch;
mod executor;
mod local;
mod profile;
mod remote;
pub mod result;
pub mod retry;

pub use batch::SimBatch;
pub use executor::Executor;
pub use local::LocalExecutor;
pub use profile::SimProfile;
pub use remote::RemoteExecutor;
