//! Configuration types and loading from `bootable.toml`.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod env;
mod loader;
pub use loader::ConfigLoader;

/// Complete configuration for bootable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// GRUB installation and menu generation.
    #[serde(default)]
    pub grub: GrubConfig,

    /// Target drive formatting.
    #[serde(default)]
    pub disk: DiskConfig,

    /// Where ISOs are placed on the drive.
    #[serde(default)]
    pub iso: IsoConfig,

    /// Enable verbose output.
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::from_toml_str(&content)
    }
}

/// GRUB configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrubConfig {
    /// Directory of `*.tpl` files replacing the built-in templates.
    #[serde(default, rename = "templates-dir")]
    pub templates_dir: Option<PathBuf>,

    /// Write `grub.cfg.tmp` and rename it into place only on success.
    #[serde(default, rename = "atomic-write")]
    pub atomic_write: bool,

    /// `grub-install` target for BIOS boot.
    #[serde(default = "default_bios_target", rename = "bios-target")]
    pub bios_target: String,

    /// `grub-install` target for UEFI boot.
    #[serde(default = "default_uefi_target", rename = "uefi-target")]
    pub uefi_target: String,
}

impl Default for GrubConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            atomic_write: false,
            bios_target: default_bios_target(),
            uefi_target: default_uefi_target(),
        }
    }
}

fn default_bios_target() -> String {
    "i386-pc".to_string()
}

fn default_uefi_target() -> String {
    "x86_64-efi".to_string()
}

/// Drive formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// FAT32 volume label.
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
        }
    }
}

fn default_label() -> String {
    "MULTIBOOT".to_string()
}

/// ISO placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoConfig {
    /// Directory under the drive root that receives the ISOs.
    #[serde(default = "default_iso_dir")]
    pub dir: String,
}

impl Default for IsoConfig {
    fn default() -> Self {
        Self {
            dir: default_iso_dir(),
        }
    }
}

fn default_iso_dir() -> String {
    "ISOs".to_string()
}
