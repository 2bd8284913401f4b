use super::{Template, TemplateSource};
use crate::core::error::{Error, Result};
use crate::image::{Architecture, Classification, Family};
use std::collections::HashMap;

/// Name of the static preamble unit.
pub const HEADER: &str = "header";

/// Name of the fallback entry template.
pub const GENERIC: &str = "generic";

/// Lookup key for an entry template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub family: Family,
    pub arch: Architecture,
}

impl From<Classification> for TemplateKey {
    fn from(c: Classification) -> Self {
        Self {
            family: c.family,
            arch: c.arch,
        }
    }
}

impl TemplateKey {
    /// Template names to try, most specific first: `family-arch`, `family`,
    /// then `generic`.
    pub fn candidates(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(3);
        if self.arch != Architecture::Unknown {
            names.push(format!("{}-{}", self.family.token(), self.arch.token()));
        }
        names.push(self.family.token().to_string());
        if self.family != Family::Generic {
            names.push(GENERIC.to_string());
        }
        names
    }
}

/// Templates loaded once per run.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    header: Option<String>,
    generic: Template,
    templates: HashMap<String, Template>,
}

impl TemplateStore {
    /// Read and parse every unit from `source`.
    ///
    /// Fails if the source is unreadable, any template is malformed, or the
    /// `generic` template is missing. A missing `header` is reported later by
    /// [`TemplateStore::header`].
    pub fn load(source: &dyn TemplateSource) -> Result<Self> {
        let mut header = None;
        let mut templates = HashMap::new();

        for unit in source.units()? {
            if unit.name == HEADER {
                header = Some(unit.text);
                continue;
            }
            let template = Template::parse(unit.name.clone(), &unit.text)?;
            templates.insert(unit.name, template);
        }

        let generic = templates.remove(GENERIC).ok_or_else(|| {
            Error::template_load(
                GENERIC,
                format!("default template missing from {}", source.describe()),
            )
        })?;

        tracing::debug!(
            "Loaded {} templates from {}",
            templates.len() + 1,
            source.describe()
        );

        Ok(Self {
            header,
            generic,
            templates,
        })
    }

    /// The static header block, verbatim.
    pub fn header(&self) -> Result<&str> {
        self.header
            .as_deref()
            .ok_or_else(|| Error::template_load(HEADER, "header template missing"))
    }

    /// Pick the template for a classification, falling back to `generic`.
    pub fn resolve(&self, classification: Classification) -> &Template {
        TemplateKey::from(classification)
            .candidates()
            .iter()
            .find_map(|name| self.templates.get(name))
            .unwrap_or(&self.generic)
    }

    /// Names of all entry templates, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .templates
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(GENERIC))
            .collect();
        names.sort_unstable();
        names
    }
}
