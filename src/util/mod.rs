//! Filesystem and external command helpers.

pub mod command;
pub mod fs;

pub use command::{run, run_with_stdin};
pub use fs::ensure_dir_exists;
