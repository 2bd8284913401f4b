//! Bootloader trait and the GRUB implementation.

use crate::core::error::Result;
use std::path::{Path, PathBuf};

pub mod grub;

pub use grub::{GRUB_CFG_PATH, GrubBootloader};

/// A bootloader that can be installed onto a drive and given a boot menu.
pub trait Bootloader: Send + Sync {
    /// Install boot code onto `device`, placing its files under `mount_point`.
    fn install(&self, device: &str, mount_point: &Path) -> Result<()>;

    /// Write the boot menu listing `images` (paths as seen from the drive root).
    ///
    /// Returns the path of the written configuration file.
    fn write_config(&self, mount_point: &Path, images: &[PathBuf]) -> Result<PathBuf>;

    /// Get a human-readable name for this bootloader.
    fn name(&self) -> &str;
}
