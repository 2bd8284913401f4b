use crate::bootloader::grub::GRUB_CFG_PATH;
use crate::core::error::{Error, Result};
use crate::image::ImageDescriptor;
use crate::template::{BuiltinTemplates, EntryData, TemplateSource, TemplateStore, render};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The four ordered steps that produce a configuration file.
pub trait BuildSteps {
    /// Create the output file.
    fn create(&mut self) -> Result<()>;

    /// Append the static header block.
    fn write_header(&mut self) -> Result<()>;

    /// Append one rendered entry per image, in input order.
    fn write_entries(&mut self) -> Result<()>;

    /// Flush to durable storage and release the file.
    fn finalize(&mut self) -> Result<()>;
}

/// Inputs for one construction run.
#[derive(Clone)]
pub struct BuildConfig {
    /// Root of the mounted target filesystem.
    pub mount_point: PathBuf,

    /// Image paths as they should appear in the boot menu, in menu order.
    pub images: Vec<PathBuf>,

    /// Where templates are read from.
    pub templates: Arc<dyn TemplateSource>,

    /// Write to `grub.cfg.tmp` and rename into place on finalize.
    pub atomic_write: bool,
}

impl BuildConfig {
    /// Configuration using the built-in templates.
    pub fn new(mount_point: impl Into<PathBuf>, images: Vec<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
            images,
            templates: Arc::new(BuiltinTemplates::new()),
            atomic_write: false,
        }
    }

    /// Use a different template source.
    pub fn templates<S: TemplateSource + 'static>(mut self, source: S) -> Self {
        self.templates = Arc::new(source);
        self
    }

    /// Enable or disable write-then-rename.
    pub fn atomic_write(mut self, enabled: bool) -> Self {
        self.atomic_write = enabled;
        self
    }

    /// Final location of the configuration file.
    pub fn output_path(&self) -> PathBuf {
        self.mount_point.join(GRUB_CFG_PATH)
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("mount_point", &self.mount_point)
            .field("images", &self.images)
            .field("templates", &self.templates.describe())
            .field("atomic_write", &self.atomic_write)
            .finish()
    }
}

/// Construction progress of a [`GrubCfgBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Empty,
    FileReady,
    HeaderWritten,
    EntriesWritten,
    Finalized,
    Failed,
}

impl BuildState {
    fn name(self) -> &'static str {
        match self {
            BuildState::Empty => "empty",
            BuildState::FileReady => "file-ready",
            BuildState::HeaderWritten => "header-written",
            BuildState::EntriesWritten => "entries-written",
            BuildState::Finalized => "finalized",
            BuildState::Failed => "failed",
        }
    }
}

struct Output {
    /// Where the file is being written (differs from the final path in atomic mode).
    write_path: PathBuf,
    writer: BufWriter<File>,
}

impl Output {
    /// Append a block and terminate it with a blank line.
    fn append(&mut self, block: &str) -> Result<()> {
        let mut write = || -> std::io::Result<()> {
            self.writer.write_all(block.as_bytes())?;
            if !block.ends_with('\n') {
                self.writer.write_all(b"\n")?;
            }
            self.writer.write_all(b"\n")
        };
        write().map_err(|e| Error::file(&self.write_path, e))
    }
}

/// Writes `boot/grub/grub.cfg` under a mount point.
///
/// Steps must run in the order of [`BuildSteps`]; calling one out of order
/// returns [`Error::InvalidState`] and leaves the builder untouched. A step
/// that fails moves the builder to [`BuildState::Failed`]; whatever was
/// written so far stays on disk unless atomic writes are enabled.
pub struct GrubCfgBuilder {
    config: BuildConfig,
    state: BuildState,
    output: Option<Output>,
    store: Option<TemplateStore>,
}

impl GrubCfgBuilder {
    /// Create a builder for one run.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            state: BuildState::Empty,
            output: None,
            store: None,
        }
    }

    /// Replace the configuration. Only allowed before [`BuildSteps::create`].
    pub fn configure(&mut self, config: BuildConfig) -> Result<()> {
        self.expect(BuildState::Empty, "configure")?;
        self.config = config;
        Ok(())
    }

    /// Current construction state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Final location of the configuration file.
    pub fn output_path(&self) -> PathBuf {
        self.config.output_path()
    }

    fn expect(&self, expected: BuildState, step: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                step,
                state: self.state.name(),
            })
        }
    }

    /// Record the outcome of a step.
    fn settle(&mut self, result: Result<()>, next: BuildState) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(err) => {
                self.abort();
                Err(err)
            }
        }
    }

    fn abort(&mut self) {
        self.state = BuildState::Failed;
        if let Some(output) = self.output.take() {
            let Output { write_path, writer } = output;
            drop(writer);
            if self.config.atomic_write {
                if let Err(e) = std::fs::remove_file(&write_path) {
                    tracing::warn!("Failed to remove {}: {}", write_path.display(), e);
                }
            }
        }
    }

    fn open(&self) -> Result<Output> {
        let path = self.config.output_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
        }

        let write_path = if self.config.atomic_write {
            temp_path(&path)
        } else {
            path
        };
        let file = File::create(&write_path).map_err(|e| Error::file(&write_path, e))?;
        tracing::debug!("Created {}", write_path.display());

        Ok(Output {
            write_path,
            writer: BufWriter::new(file),
        })
    }

    fn append_header(&mut self) -> Result<()> {
        if self.store.is_none() {
            self.store = Some(TemplateStore::load(self.config.templates.as_ref())?);
        }
        let (Some(store), Some(output)) = (self.store.as_ref(), self.output.as_mut()) else {
            return Err(Error::InvalidState {
                step: "write header",
                state: self.state.name(),
            });
        };

        output.append(store.header()?)
    }

    fn append_entries(&mut self) -> Result<()> {
        let (Some(store), Some(output)) = (self.store.as_ref(), self.output.as_mut()) else {
            return Err(Error::InvalidState {
                step: "write entries",
                state: self.state.name(),
            });
        };

        for path in &self.config.images {
            let image = ImageDescriptor::new(path);
            let classification = image.classification();
            let template = store.resolve(classification);
            tracing::debug!(
                "{}: family={} arch={} template={}",
                image.base_name,
                classification.family,
                classification.arch,
                template.name()
            );

            let entry = render(template, &EntryData::from(&image))?;
            output.append(&entry)?;
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(Output { write_path, writer }) = self.output.take() else {
            return Err(Error::InvalidState {
                step: "finalize",
                state: self.state.name(),
            });
        };

        let path = self.config.output_path();
        if let Err(err) = commit(writer, &write_path, &path) {
            if write_path != path {
                if let Err(e) = std::fs::remove_file(&write_path) {
                    tracing::warn!("Failed to remove {}: {}", write_path.display(), e);
                }
            }
            return Err(err);
        }

        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Flush and sync `writer`, then move `write_path` to `path` if they differ.
fn commit(writer: BufWriter<File>, write_path: &Path, path: &Path) -> Result<()> {
    let file = writer
        .into_inner()
        .map_err(|e| Error::file(write_path, e.into_error()))?;
    file.sync_all().map_err(|e| Error::file(write_path, e))?;
    drop(file);

    if write_path != path {
        std::fs::rename(write_path, path).map_err(|e| Error::file(path, e))?;
    }
    Ok(())
}

impl BuildSteps for GrubCfgBuilder {
    fn create(&mut self) -> Result<()> {
        self.expect(BuildState::Empty, "create")?;
        let result = self.open().map(|output| {
            self.output = Some(output);
        });
        self.settle(result, BuildState::FileReady)
    }

    fn write_header(&mut self) -> Result<()> {
        self.expect(BuildState::FileReady, "write header")?;
        let result = self.append_header();
        self.settle(result, BuildState::HeaderWritten)
    }

    fn write_entries(&mut self) -> Result<()> {
        self.expect(BuildState::HeaderWritten, "write entries")?;
        let result = self.append_entries();
        self.settle(result, BuildState::EntriesWritten)
    }

    fn finalize(&mut self) -> Result<()> {
        self.expect(BuildState::EntriesWritten, "finalize")?;
        let result = self.close();
        self.settle(result, BuildState::Finalized)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemorySource;

    const ENTRY: &str = "menuentry \"{{.MenuTitle}}\" {\n    loopback loop {{.ISOPath}}\n}\n";

    fn templates() -> MemorySource {
        MemorySource::new()
            .with("header", "set timeout=5\n")
            .with("generic", ENTRY)
    }

    fn builder(mount: &Path, images: &[&str]) -> GrubCfgBuilder {
        let images = images.iter().map(PathBuf::from).collect();
        GrubCfgBuilder::new(BuildConfig::new(mount, images).templates(templates()))
    }

    #[test]
    fn test_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path(), &["/ISOs/a.iso"]);

        b.create().unwrap();
        assert_eq!(b.state(), BuildState::FileReady);
        b.write_header().unwrap();
        assert_eq!(b.state(), BuildState::HeaderWritten);
        b.write_entries().unwrap();
        assert_eq!(b.state(), BuildState::EntriesWritten);
        b.finalize().unwrap();
        assert_eq!(b.state(), BuildState::Finalized);

        let content = std::fs::read_to_string(dir.path().join("boot/grub/grub.cfg")).unwrap();
        assert_eq!(
            content,
            "set timeout=5\n\nmenuentry \"Boot ISO: a.iso\" {\n    loopback loop /ISOs/a.iso\n}\n\n"
        );
    }

    #[test]
    fn test_entries_before_header_rejected_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path(), &["/ISOs/a.iso"]);
        b.create().unwrap();

        let err = b.write_entries().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                step: "write entries",
                state: "file-ready"
            }
        ));
        assert_eq!(b.state(), BuildState::FileReady);

        b.write_header().unwrap();
        b.write_entries().unwrap();
        b.finalize().unwrap();
    }

    #[test]
    fn test_finalize_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path(), &[]);

        let err = b.finalize().unwrap_err();
        assert!(matches!(err, Error::InvalidState { step: "finalize", state: "empty" }));
        assert!(!dir.path().join("boot").exists());
    }

    #[test]
    fn test_configure_only_before_create() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path(), &[]);

        b.configure(BuildConfig::new(dir.path(), vec![]).templates(templates()))
            .unwrap();
        b.configure(BuildConfig::new(other.path(), vec![]).templates(templates()))
            .unwrap();
        assert_eq!(b.state(), BuildState::Empty);
        assert_eq!(b.output_path(), other.path().join("boot/grub/grub.cfg"));

        b.create().unwrap();
        let err = b
            .configure(BuildConfig::new(dir.path(), vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { step: "configure", .. }));
    }

    #[test]
    fn test_missing_header_fails_and_leaves_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with("generic", ENTRY);
        let mut b = GrubCfgBuilder::new(BuildConfig::new(dir.path(), vec![]).templates(source));

        b.create().unwrap();
        let err = b.write_header().unwrap_err();
        assert!(matches!(err, Error::TemplateLoad { .. }));
        assert_eq!(b.state(), BuildState::Failed);

        let cfg = dir.path().join("boot/grub/grub.cfg");
        assert_eq!(std::fs::metadata(&cfg).unwrap().len(), 0);

        // Failed is terminal.
        assert!(matches!(b.write_entries(), Err(Error::InvalidState { .. })));
        assert!(matches!(b.finalize(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_render_failure_stops_at_offending_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = templates().with("fedora", "menuentry {{.Kernel}} {}\n");
        let images = vec![
            PathBuf::from("/ISOs/debian-12.iso"),
            PathBuf::from("/ISOs/fedora-40.iso"),
            PathBuf::from("/ISOs/alpine.iso"),
        ];
        let mut b = GrubCfgBuilder::new(BuildConfig::new(dir.path(), images).templates(source));

        b.create().unwrap();
        b.write_header().unwrap();
        let err = b.write_entries().unwrap_err();
        match err {
            Error::Render { image, .. } => assert_eq!(image, PathBuf::from("/ISOs/fedora-40.iso")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(b.state(), BuildState::Failed);

        let content = std::fs::read_to_string(dir.path().join("boot/grub/grub.cfg")).unwrap();
        assert!(content.contains("debian-12.iso"));
        assert!(!content.contains("alpine.iso"));
    }

    #[test]
    fn test_create_fails_when_mount_point_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let mut b = builder(&not_a_dir, &[]);
        let err = b.create().unwrap_err();
        assert!(matches!(err, Error::File { .. }));
        assert_eq!(b.state(), BuildState::Failed);
    }

    #[test]
    fn test_atomic_write_renames_on_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path(), vec![PathBuf::from("/ISOs/a.iso")])
            .templates(templates())
            .atomic_write(true);
        let mut b = GrubCfgBuilder::new(config);

        let cfg = dir.path().join("boot/grub/grub.cfg");
        let tmp = dir.path().join("boot/grub/grub.cfg.tmp");

        b.create().unwrap();
        b.write_header().unwrap();
        assert!(tmp.exists());
        assert!(!cfg.exists());

        b.write_entries().unwrap();
        b.finalize().unwrap();
        assert!(cfg.exists());
        assert!(!tmp.exists());
    }

    #[test]
    fn test_atomic_write_removes_temp_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path(), vec![])
            .templates(MemorySource::new().with("generic", ENTRY))
            .atomic_write(true);
        let mut b = GrubCfgBuilder::new(config);

        b.create().unwrap();
        assert!(b.write_header().is_err());
        assert!(!dir.path().join("boot/grub/grub.cfg.tmp").exists());
        assert!(!dir.path().join("boot/grub/grub.cfg").exists());
    }

    #[test]
    fn test_atomic_write_removes_temp_when_rename_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("boot/grub/grub.cfg");
        // A non-empty directory in the way makes the final rename fail.
        std::fs::create_dir_all(cfg.join("occupied")).unwrap();

        let config = BuildConfig::new(dir.path(), vec![PathBuf::from("/ISOs/a.iso")])
            .templates(templates())
            .atomic_write(true);
        let mut b = GrubCfgBuilder::new(config);

        b.create().unwrap();
        b.write_header().unwrap();
        b.write_entries().unwrap();
        let err = b.finalize().unwrap_err();

        assert!(matches!(err, Error::File { ref path, .. } if *path == cfg));
        assert_eq!(b.state(), BuildState::Failed);
        assert!(!dir.path().join("boot/grub/grub.cfg.tmp").exists());
        assert!(cfg.join("occupied").is_dir());
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/mnt/boot/grub/grub.cfg")),
            PathBuf::from("/mnt/boot/grub/grub.cfg.tmp")
        );
    }
}
