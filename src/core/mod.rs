//! Core types for config generation: builder state machine, director, and error handling.

pub mod builder;
pub mod director;
pub mod error;

pub use builder::{BuildConfig, BuildState, BuildSteps, GrubCfgBuilder};
pub use director::GrubConfigurator;
pub use error::{Error, Result};
