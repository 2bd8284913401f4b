//! bootable: build multiboot USB drives with a GRUB menu entry per ISO.
//!
//! The library formats a drive, installs GRUB for BIOS and UEFI, copies ISO
//! images onto it and generates `boot/grub/grub.cfg` with one loopback entry
//! per image. Each image is classified by its file name into a distribution
//! family and CPU architecture, and the entry is rendered from the template
//! registered for that classification.
//!
//! # Quick Start
//!
//! Generate a boot menu for ISOs already present on a mounted drive:
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! # fn main() -> bootable::Result<()> {
//! let images = vec![
//!     PathBuf::from("/ISOs/ubuntu-22.04-amd64.iso"),
//!     PathBuf::from("/ISOs/archlinux-x86_64.iso"),
//! ];
//! bootable::write_config("/mnt/usb", &images)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Classification
//!
//! ```
//! use bootable::{Architecture, Family, classify};
//!
//! let c = classify("Fedora-Workstation-Live-x86_64-39.iso");
//! assert_eq!(c.family, Family::Fedora);
//! assert_eq!(c.arch, Architecture::X86_64);
//! ```
//!
//! # Templates
//!
//! Templates are named `{family}-{arch}` (most specific), `{family}`, or
//! `generic`, plus a `header` written once at the top. They use the
//! placeholders `{{.MenuTitle}}` and `{{.ISOPath}}`. Built-in templates are
//! compiled in; a directory of `*.tpl` files can replace them:
//!
//! ```no_run
//! use bootable::core::{BuildConfig, GrubCfgBuilder, GrubConfigurator};
//! use bootable::template::DirectorySource;
//! use std::path::PathBuf;
//!
//! # fn main() -> bootable::Result<()> {
//! let config = BuildConfig::new("/mnt/usb", vec![PathBuf::from("/ISOs/alpine-3.19-x86_64.iso")])
//!     .templates(DirectorySource::new("my-templates"))
//!     .atomic_write(true);
//! GrubConfigurator::new(GrubCfgBuilder::new(config)).construct()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `cli`
//! - `cli` - The `bootable` command-line tool

pub mod bootloader;
pub mod config;
pub mod core;
pub mod disk;
pub mod image;
pub mod template;
pub mod util;

// Re-export commonly used types
pub use crate::core::{BuildConfig, Error, GrubCfgBuilder, GrubConfigurator, Result};
pub use bootloader::grub::write_config;
pub use bootloader::{Bootloader, GrubBootloader};
pub use config::{Config, ConfigLoader};
pub use image::{Architecture, Classification, Family, classify};
