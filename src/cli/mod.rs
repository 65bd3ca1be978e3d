//! Command-line interface for scenesmith
//!
//! ## Module Structure
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, configuration and runtime setup
//! - `report`: human and JSON rendering of a [`PipelineResult`](crate::PipelineResult)

pub mod args;
mod report;
mod run;

pub use args::Cli;
pub use run::{run, run_with};
