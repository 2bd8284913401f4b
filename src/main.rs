use bootable::bootloader::{Bootloader, GrubBootloader};
use bootable::config::{Config, ConfigLoader, env};
use bootable::template::TemplateStore;
use bootable::util::command::check_command_available;
use bootable::{Error, Result, classify, disk, image};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::exit;

/// Default configuration file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "bootable.toml";

/// Tools `create` shells out to.
const REQUIRED_TOOLS: &[&str] = &[
    "grub-install",
    "wipefs",
    "sfdisk",
    "partprobe",
    "mkfs.vfat",
    "mount",
    "umount",
];

#[derive(Parser)]
#[command(name = "bootable", version, about = "Create multiboot USB drives with GRUB")]
struct Cli {
    /// Configuration file (defaults to ./bootable.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format a drive, install GRUB, copy ISOs and write the boot menu
    Create {
        /// Block device to overwrite, e.g. /dev/sdb
        #[arg(short, long)]
        device: String,

        /// ISO images to put on the drive
        #[arg(short, long = "iso", required = true)]
        isos: Vec<PathBuf>,

        /// FAT32 volume label
        #[arg(short, long)]
        label: Option<String>,

        /// Confirm that all data on the device will be destroyed
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Write boot/grub/grub.cfg for ISOs already on a mounted drive
    WriteConfig {
        /// Root of the mounted drive
        #[arg(short, long)]
        mount_point: PathBuf,

        /// ISO paths as seen from the drive root, e.g. /ISOs/ubuntu.iso
        #[arg(short, long = "iso")]
        isos: Vec<PathBuf>,
    },

    /// Show how ISO file names are classified
    Classify {
        /// ISO file names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the effective configuration and required tools
    Check,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose || config.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Create {
            device,
            isos,
            label,
            yes,
        } => create(&config, &device, &isos, label, yes),
        Command::WriteConfig { mount_point, isos } => write_config(&config, &mount_point, &isos),
        Command::Classify { names } => classify_names(&config, &names),
        Command::Check => check(&config),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    match path {
        Some(path) => loader = loader.config_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            loader = loader.config_file(DEFAULT_CONFIG_FILE);
        }
        None => {}
    }
    loader.load()
}

fn create(
    config: &Config,
    device: &str,
    isos: &[PathBuf],
    label: Option<String>,
    yes: bool,
) -> Result<()> {
    if !yes {
        return Err(Error::config(format!(
            "refusing to erase {device} without --yes"
        )));
    }
    ensure_root()?;

    for iso in isos {
        if !iso.is_file() {
            return Err(Error::config(format!("ISO not found: {}", iso.display())));
        }
    }

    let label = label.unwrap_or_else(|| config.disk.label.clone());
    tracing::info!("Formatting {} as FAT32 ({})", device, label);
    disk::format(device, &label)?;

    // Not removed on drop; see `disk::remove_mount_point`.
    let mount_dir = tempfile::Builder::new().prefix("bootable-").tempdir()?.keep();
    let result = populate(config, device, isos, &mount_dir);
    disk::remove_mount_point(&mount_dir);
    result?;

    println!("{device} is ready");
    Ok(())
}

/// Mount the new partition, install GRUB, copy ISOs, write the menu, unmount.
fn populate(config: &Config, device: &str, isos: &[PathBuf], mount_dir: &Path) -> Result<()> {
    let mount = disk::Mount::new(&disk::partition_path(device, 1), mount_dir)?;

    let grub = GrubBootloader::from_config(&config.grub);
    grub.install(device, mount.path())?;

    let images = image::copy_images(isos, mount.path(), &config.iso.dir)?;
    let output = grub.write_config(mount.path(), &images)?;
    tracing::info!("Wrote {} with {} entries", output.display(), images.len());

    mount.unmount()
}

fn write_config(config: &Config, mount_point: &Path, isos: &[PathBuf]) -> Result<()> {
    if !mount_point.is_dir() {
        return Err(Error::config(format!(
            "mount point is not a directory: {}",
            mount_point.display()
        )));
    }

    let output = GrubBootloader::from_config(&config.grub).write_config(mount_point, isos)?;
    println!("{}", output.display());
    Ok(())
}

fn classify_names(config: &Config, names: &[String]) -> Result<()> {
    let grub = GrubBootloader::from_config(&config.grub);
    let store = TemplateStore::load(grub.templates())?;

    for name in names {
        let classification = classify(name);
        let template = store.resolve(classification);
        println!(
            "{name}: family={} arch={} template={}",
            classification.family,
            classification.arch,
            template.name()
        );
    }
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    println!("Configuration:");
    println!(
        "  templates:    {}",
        config
            .grub
            .templates_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );
    println!("  atomic write: {}", config.grub.atomic_write);
    println!("  bios target:  {}", config.grub.bios_target);
    println!("  uefi target:  {}", config.grub.uefi_target);
    println!("  label:        {}", config.disk.label);
    println!("  iso dir:      {}", config.iso.dir);

    let overrides = env::detect_active_overrides();
    if !overrides.is_empty() {
        println!("Environment overrides:");
        for (key, value) in overrides {
            println!("  {key}={value}");
        }
    }

    let grub = GrubBootloader::from_config(&config.grub);
    let store = TemplateStore::load(grub.templates())?;
    println!("Templates: {}", store.names().join(", "));

    println!("Tools:");
    for tool in REQUIRED_TOOLS {
        let status = if check_command_available(tool) {
            "found"
        } else {
            "missing"
        };
        println!("  {tool}: {status}");
    }
    Ok(())
}

#[cfg(unix)]
fn ensure_root() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        Ok(())
    } else {
        Err(Error::config("this command must be run as root"))
    }
}

#[cfg(not(unix))]
fn ensure_root() -> Result<()> {
    Err(Error::config("creating drives is only supported on unix"))
}
