//! ISO image descriptors, classification, and copying images onto the drive.

use crate::core::error::{Error, Result};
use crate::util::fs::copy_file;
use std::path::{Path, PathBuf};

pub mod classify;

pub use classify::{Architecture, Classification, Family, classify};

/// Per-image data derived from one input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Path as given, used by the boot menu to locate the ISO.
    pub path: PathBuf,

    /// File name component, used for classification and display.
    pub base_name: String,

    /// Menu entry title.
    pub menu_title: String,
}

impl ImageDescriptor {
    /// Derive a descriptor from an image path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let menu_title = format!("Boot ISO: {base_name}");

        Self {
            path,
            base_name,
            menu_title,
        }
    }

    /// Classify this image by its base name.
    pub fn classification(&self) -> Classification {
        classify(&self.base_name)
    }
}

/// Copy ISO images into `{mount_point}/{iso_dir}` and return their in-drive
/// paths (`/{iso_dir}/{name}`) in input order.
pub fn copy_images(sources: &[PathBuf], mount_point: &Path, iso_dir: &str) -> Result<Vec<PathBuf>> {
    let target_dir = mount_point.join(iso_dir);
    let mut copied = Vec::with_capacity(sources.len());

    for source in sources {
        let name = source.file_name().ok_or_else(|| {
            Error::config(format!("not a file path: {}", source.display()))
        })?;
        let dest = target_dir.join(name);

        tracing::info!("Copying {} -> {}", source.display(), dest.display());
        copy_file(source, &dest).map_err(|e| Error::file(source, e))?;

        copied.push(Path::new("/").join(iso_dir).join(name));
    }

    Ok(copied)
}
