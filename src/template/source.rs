use crate::core::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One named text unit read from a template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUnit {
    pub name: String,
    pub text: String,
}

impl TemplateUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Provider of named template units.
///
/// Two names are reserved: `header` (written once, verbatim) and `generic`
/// (the fallback entry, must always exist).
pub trait TemplateSource: Send + Sync {
    /// Read every unit. Called once per construction run.
    fn units(&self) -> Result<Vec<TemplateUnit>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    const UNITS: &'static [(&'static str, &'static str)] = &[
        ("header", include_str!("../../templates/header.tpl")),
        ("generic", include_str!("../../templates/generic.tpl")),
        ("debian", include_str!("../../templates/debian.tpl")),
        ("debian-i386", include_str!("../../templates/debian-i386.tpl")),
        ("pop-os", include_str!("../../templates/pop-os.tpl")),
        ("fedora", include_str!("../../templates/fedora.tpl")),
        ("opensuse", include_str!("../../templates/opensuse.tpl")),
        ("alpine", include_str!("../../templates/alpine.tpl")),
        ("arch", include_str!("../../templates/arch.tpl")),
    ];

    pub fn new() -> Self {
        Self
    }
}

impl TemplateSource for BuiltinTemplates {
    fn units(&self) -> Result<Vec<TemplateUnit>> {
        Ok(Self::UNITS
            .iter()
            .map(|&(name, text)| TemplateUnit::new(name, text))
            .collect())
    }

    fn describe(&self) -> String {
        "built-in templates".to_string()
    }
}

/// Templates read from `*.tpl` files in a directory. The file stem is the
/// template name, so `debian-x86_64.tpl` becomes `debian-x86_64`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirectorySource {
    fn units(&self) -> Result<Vec<TemplateUnit>> {
        let unreadable = |e: std::io::Error| {
            Error::template_load(self.root.display().to_string(), format!("unreadable: {e}"))
        };

        let mut units = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("tpl") {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|e| {
                Error::template_load(name, format!("failed to read {}: {e}", path.display()))
            })?;
            units.push(TemplateUnit::new(name, text));
        }

        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    fn describe(&self) -> String {
        format!("template directory {}", self.root.display())
    }
}

/// In-memory templates, mostly for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    units: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.units.insert(name.into(), text.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.units.remove(name)
    }
}

impl TemplateSource for MemorySource {
    fn units(&self) -> Result<Vec<TemplateUnit>> {
        Ok(self
            .units
            .iter()
            .map(|(name, text)| TemplateUnit::new(name.clone(), text.clone()))
            .collect())
    }

    fn describe(&self) -> String {
        format!("{} in-memory templates", self.units.len())
    }
}
