//! Batch driver for SimulationCraft.
//!
//! Generates profileset requests for chart pipelines (races, trinkets),
//! executes them locally or through a remote job queue, and writes the
//! collected DPS data as JSON chart documents.

pub mod build_info;
pub mod character;
pub mod config;
pub mod error;
pub mod gamedata;
pub mod pipeline;
pub mod report;
pub mod simulation;

pub use config::{RemoteSettings, Settings};
pub use error::{ProfileError, SimError};
