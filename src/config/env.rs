//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `BOOTABLE_`
//!
//! - `BOOTABLE_PROFILE`: select a configuration profile
//! - `BOOTABLE_TEMPLATES_DIR`: read templates from this directory
//! - `BOOTABLE_ATOMIC_WRITE`: write-then-rename `grub.cfg` (1/true/yes or 0/false/no)
//! - `BOOTABLE_BIOS_TARGET`: override the BIOS `grub-install` target
//! - `BOOTABLE_UEFI_TARGET`: override the UEFI `grub-install` target
//! - `BOOTABLE_LABEL`: override the FAT32 volume label
//! - `BOOTABLE_ISO_DIR`: override the ISO directory on the drive
//! - `BOOTABLE_VERBOSE`: enable verbose output (1/true/yes)

use super::Config;
use std::path::PathBuf;

const PREFIX: &str = "BOOTABLE_";

const OVERRIDE_KEYS: &[&str] = &[
    "TEMPLATES_DIR",
    "ATOMIC_WRITE",
    "BIOS_TARGET",
    "UEFI_TARGET",
    "LABEL",
    "ISO_DIR",
    "VERBOSE",
];

/// Read the active profile name from `BOOTABLE_PROFILE`.
pub fn get_profile_name() -> Option<String> {
    env_str("PROFILE")
}

/// Apply individual env var overrides to a config.
///
/// Each override is applied only if the env var is set and non-empty.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(val) = env_str("TEMPLATES_DIR") {
        config.grub.templates_dir = Some(PathBuf::from(val));
    }

    if let Some(val) = env_bool("ATOMIC_WRITE") {
        config.grub.atomic_write = val;
    }

    if let Some(val) = env_str("BIOS_TARGET") {
        config.grub.bios_target = val;
    }

    if let Some(val) = env_str("UEFI_TARGET") {
        config.grub.uefi_target = val;
    }

    if let Some(val) = env_str("LABEL") {
        config.disk.label = val;
    }

    if let Some(val) = env_str("ISO_DIR") {
        config.iso.dir = val;
    }

    if let Some(val) = env_bool("VERBOSE") {
        config.verbose = val;
    }
}

/// Summarize which env var overrides are currently active.
///
/// Returns a list of `(env_var_name, value)` pairs for display in `check`.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    std::iter::once("PROFILE")
        .chain(OVERRIDE_KEYS.iter().copied())
        .filter_map(|key| {
            let full = format!("{PREFIX}{key}");
            env_str(key).map(|val| (full, val))
        })
        .collect()
}

// --- helpers ---

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_str(suffix).map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
}
