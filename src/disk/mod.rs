//! Preparing the target drive: partition naming, formatting, and mounting.

use crate::core::error::{Error, Result};
use crate::util::command::{run, run_with_stdin};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `sfdisk` script: one partition spanning the disk, type `c` (FAT32 LBA), bootable.
const SFDISK_LAYOUT: &str = ",,c,*\n";

/// Path of partition `n` on `device`.
///
/// Devices whose name ends in a digit get a `p` separator
/// (`/dev/nvme0n1` -> `/dev/nvme0n1p1`, `/dev/sdb` -> `/dev/sdb1`).
pub fn partition_path(device: &str, n: u32) -> String {
    match device.chars().last() {
        None => String::new(),
        Some(c) if c.is_ascii_digit() => format!("{device}p{n}"),
        Some(_) => format!("{device}{n}"),
    }
}

/// Wipe `device` and create a single bootable FAT32 partition labelled `label`.
pub fn format(device: &str, label: &str) -> Result<()> {
    let partition = partition_path(device, 1);

    // The partition may not be mounted at all.
    if let Err(e) = run("umount", &["-f", partition.as_str()]) {
        tracing::debug!("Ignoring umount failure: {}", e);
    }

    run("wipefs", &["-a", device])?;
    run_with_stdin(SFDISK_LAYOUT, "sfdisk", &[device])?;

    if let Err(e) = run("partprobe", &[device]) {
        tracing::warn!("partprobe failed ({}), falling back to blockdev", e);
        if let Err(e) = run("blockdev", &["--rereadpt", device]) {
            tracing::warn!("blockdev --rereadpt failed: {}", e);
        }
    }

    // Give udev a moment to create the partition node.
    std::thread::sleep(Duration::from_secs(1));

    run("mkfs.vfat", &["-F32", "-n", label, partition.as_str()]).map_err(|e| match e {
        Error::Command { program, reason } => {
            Error::command(program, format!("on {partition}: {reason}"))
        }
        other => other,
    })
}

/// A mounted filesystem, unmounted again on drop.
///
/// Call [`Mount::unmount`] to learn whether unmounting worked; drop only logs.
#[derive(Debug)]
pub struct Mount {
    mount_point: PathBuf,
    mounted: bool,
}

impl Mount {
    /// Mount `source` at `mount_point`.
    pub fn new(source: &str, mount_point: impl Into<PathBuf>) -> Result<Self> {
        let mount_point = mount_point.into();
        tracing::info!("Mounting {} to {}", source, mount_point.display());
        run("mount", &[source, &*mount_point.to_string_lossy()])?;
        Ok(Self {
            mount_point,
            mounted: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.mount_point
    }

    /// Sync and unmount.
    pub fn unmount(mut self) -> Result<()> {
        self.mounted = false;
        release(&self.mount_point)
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }
        if let Err(e) = release(&self.mount_point) {
            tracing::warn!("Failed to unmount {}: {}", self.mount_point.display(), e);
        }
    }
}

fn release(mount_point: &Path) -> Result<()> {
    tracing::info!("Unmounting {}", mount_point.display());
    if let Err(e) = run("sync", &[]) {
        tracing::warn!("sync failed: {}", e);
    }
    run("umount", &[&*mount_point.to_string_lossy()])
}

/// Remove an empty mount point directory.
///
/// Never deletes contents: if the directory is still mounted or not empty it
/// is left in place with a warning.
pub fn remove_mount_point(mount_point: &Path) {
    if let Err(e) = std::fs::remove_dir(mount_point) {
        tracing::warn!("Leaving {} in place: {}", mount_point.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_path_plain_device() {
        assert_eq!(partition_path("/dev/sdb", 1), "/dev/sdb1");
        assert_eq!(partition_path("/dev/sdc", 2), "/dev/sdc2");
    }

    #[test]
    fn test_partition_path_digit_suffix() {
        assert_eq!(partition_path("/dev/nvme0n1", 1), "/dev/nvme0n1p1");
        assert_eq!(partition_path("/dev/mmcblk0", 1), "/dev/mmcblk0p1");
        assert_eq!(partition_path("/dev/loop7", 3), "/dev/loop7p3");
    }

    #[test]
    fn test_partition_path_empty_device() {
        assert_eq!(partition_path("", 1), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_unmount_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mount = Mount {
            mount_point: dir.path().to_path_buf(),
            mounted: true,
        };

        let err = mount.unmount().unwrap_err();
        assert!(matches!(err, Error::Command { ref program, .. } if program == "umount"));
    }

    #[test]
    fn test_remove_mount_point_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mount_point = dir.path().join("mnt");
        std::fs::create_dir_all(mount_point.join("ISOs")).unwrap();
        std::fs::write(mount_point.join("ISOs/debian.iso"), b"iso").unwrap();

        remove_mount_point(&mount_point);
        assert!(mount_point.join("ISOs/debian.iso").is_file());

        std::fs::remove_dir_all(mount_point.join("ISOs")).unwrap();
        remove_mount_point(&mount_point);
        assert!(!mount_point.exists());
    }
}
