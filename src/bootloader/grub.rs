use super::Bootloader;
use crate::config::GrubConfig;
use crate::core::builder::{BuildConfig, GrubCfgBuilder};
use crate::core::director::GrubConfigurator;
use crate::core::error::{Error, Result};
use crate::template::{BuiltinTemplates, DirectorySource, TemplateSource};
use crate::util::command::run;
use crate::util::fs::ensure_dir_exists;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Location of the GRUB configuration file relative to the drive root.
pub const GRUB_CFG_PATH: &str = "boot/grub/grub.cfg";

/// GRUB bootloader, installed for both BIOS and UEFI boot.
pub struct GrubBootloader {
    bios_target: String,
    uefi_target: String,
    templates: Arc<dyn TemplateSource>,
    atomic_write: bool,
}

impl GrubBootloader {
    /// Create a GRUB bootloader with default targets and built-in templates.
    pub fn new() -> Self {
        Self::from_config(&GrubConfig::default())
    }

    /// Create a GRUB bootloader from the `[grub]` configuration section.
    pub fn from_config(config: &GrubConfig) -> Self {
        let templates: Arc<dyn TemplateSource> = match &config.templates_dir {
            Some(dir) => Arc::new(DirectorySource::new(dir)),
            None => Arc::new(BuiltinTemplates::new()),
        };
        Self {
            bios_target: config.bios_target.clone(),
            uefi_target: config.uefi_target.clone(),
            templates,
            atomic_write: config.atomic_write,
        }
    }

    /// Use a different template source for menu generation.
    pub fn with_templates<S: TemplateSource + 'static>(mut self, source: S) -> Self {
        self.templates = Arc::new(source);
        self
    }

    /// Template source used for menu generation.
    pub fn templates(&self) -> &dyn TemplateSource {
        self.templates.as_ref()
    }
}

impl Default for GrubBootloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootloader for GrubBootloader {
    fn install(&self, device: &str, mount_point: &Path) -> Result<()> {
        let boot_dir = mount_point.join("boot");
        for dir in [boot_dir.join("grub"), mount_point.join("EFI")] {
            ensure_dir_exists(&dir).map_err(|e| Error::file(&dir, e))?;
        }

        let boot_dir = boot_dir.to_string_lossy();
        let efi_dir = mount_point.to_string_lossy();

        tracing::info!("Installing GRUB ({}) to {}", self.bios_target, device);
        grub_install(
            &self.bios_target,
            &[&format!("--boot-directory={boot_dir}"), "--recheck", device],
        )?;

        tracing::info!("Installing GRUB ({}) to {}", self.uefi_target, efi_dir);
        grub_install(
            &self.uefi_target,
            &[
                &format!("--efi-directory={efi_dir}"),
                &format!("--boot-directory={boot_dir}"),
                "--removable",
            ],
        )
    }

    fn write_config(&self, mount_point: &Path, images: &[PathBuf]) -> Result<PathBuf> {
        tracing::debug!("Generating GRUB menu from {}", self.templates.describe());

        let mut config =
            BuildConfig::new(mount_point, images.to_vec()).atomic_write(self.atomic_write);
        config.templates = Arc::clone(&self.templates);
        let output = config.output_path();

        GrubConfigurator::new(GrubCfgBuilder::new(config)).construct()?;
        Ok(output)
    }

    fn name(&self) -> &str {
        "GRUB"
    }
}

/// Run `grub-install --target=<target>` with extra arguments.
fn grub_install(target: &str, args: &[&str]) -> Result<()> {
    let target_arg = format!("--target={target}");
    let mut full = vec![target_arg.as_str()];
    full.extend_from_slice(args);

    run("grub-install", &full).map_err(|e| match e {
        Error::Command { program, reason } => {
            Error::command(program, format!("target {target}: {reason}"))
        }
        other => other,
    })
}

/// Write `boot/grub/grub.cfg` under `mount_point` using the built-in templates.
///
/// `images` are the paths GRUB should loop-mount, relative to the drive root
/// (for example `/ISOs/ubuntu-22.04-amd64.iso`). Entries appear in the given order.
pub fn write_config(mount_point: impl AsRef<Path>, images: &[PathBuf]) -> Result<PathBuf> {
    GrubBootloader::new().write_config(mount_point.as_ref(), images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemorySource;

    fn memory_templates() -> MemorySource {
        MemorySource::new()
            .with("header", "set timeout=5\n")
            .with("generic", "menuentry \"{{.MenuTitle}}\" { loopback loop {{.ISOPath}} }")
    }

    #[test]
    fn test_grub_cfg_path_under_mount() {
        let mount = Path::new("/mnt/usb");
        assert_eq!(
            mount.join(GRUB_CFG_PATH),
            PathBuf::from("/mnt/usb/boot/grub/grub.cfg")
        );
    }

    #[test]
    fn test_from_config_targets() {
        let config = GrubConfig {
            bios_target: "i386-pc".to_string(),
            uefi_target: "i386-efi".to_string(),
            ..GrubConfig::default()
        };
        let grub = GrubBootloader::from_config(&config);
        assert_eq!(grub.bios_target, "i386-pc");
        assert_eq!(grub.uefi_target, "i386-efi");
        assert_eq!(grub.name(), "GRUB");
    }

    #[test]
    fn test_from_config_templates_dir() {
        let config = GrubConfig {
            templates_dir: Some(PathBuf::from("/etc/bootable/templates")),
            ..GrubConfig::default()
        };
        let grub = GrubBootloader::from_config(&config);
        assert_eq!(
            grub.templates.describe(),
            "template directory /etc/bootable/templates"
        );
    }

    #[test]
    fn test_grub_install_error_names_target() {
        let err = grub_install("i386-pc", &["--no-such-option"]).unwrap_err();
        match err {
            Error::Command { program, reason } => {
                assert_eq!(program, "grub-install");
                assert!(reason.starts_with("target i386-pc: "));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_config_with_memory_templates() {
        let mount = tempfile::tempdir().unwrap();
        let grub = GrubBootloader::new().with_templates(memory_templates());

        let output = grub
            .write_config(mount.path(), &[PathBuf::from("/ISOs/tails.iso")])
            .unwrap();

        assert_eq!(output, mount.path().join(GRUB_CFG_PATH));
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "set timeout=5\n\nmenuentry \"Boot ISO: tails.iso\" { loopback loop /ISOs/tails.iso }\n\n"
        );
    }

    #[test]
    fn test_write_config_builtin_templates() {
        let mount = tempfile::tempdir().unwrap();
        let output = write_config(
            mount.path(),
            &[PathBuf::from("/ISOs/ubuntu-22.04-amd64.iso")],
        )
        .unwrap();

        let content = std::fs::read_to_string(output).unwrap();
        assert!(content.contains("Boot ISO: ubuntu-22.04-amd64"));
        assert!(content.contains("/ISOs/ubuntu-22.04-amd64.iso"));
    }

    #[test]
    fn test_write_config_missing_templates_dir() {
        let mount = tempfile::tempdir().unwrap();
        let config = GrubConfig {
            templates_dir: Some(mount.path().join("no-such-dir")),
            ..GrubConfig::default()
        };
        let result = GrubBootloader::from_config(&config).write_config(mount.path(), &[]);
        assert!(matches!(result, Err(Error::TemplateLoad { .. })));
    }
}
