//! Boot-entry templates: parsing, sources, lookup with fallback, and rendering.
//!
//! A template is free-form GRUB menu syntax with two substitution points:
//!
//! ```text
//! menuentry "{{.MenuTitle}}" {
//!     loopback loop "{{.ISOPath}}"
//!     ...
//! }
//! ```
//!
//! The leading dot and inner whitespace are optional, so `{{ MenuTitle }}`
//! is equivalent. GRUB's own `$var` syntax is left untouched.

use crate::core::error::{Error, Result};

mod render;
mod source;
mod store;

pub use render::{EntryData, render};
pub use source::{BuiltinTemplates, DirectorySource, MemorySource, TemplateSource, TemplateUnit};
pub use store::{GENERIC, HEADER, TemplateKey, TemplateStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed boot-entry template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text. Unterminated or empty placeholders are rejected.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                Error::template_load(
                    &name,
                    format!("unterminated placeholder on line {}", line_of(text, rest, start)),
                )
            })?;

            let inner = after[..end].trim();
            let field = inner.strip_prefix('.').unwrap_or(inner).trim();
            if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::template_load(
                    &name,
                    format!("invalid placeholder `{{{{{}}}}}`", &after[..end]),
                ));
            }
            segments.push(Segment::Placeholder(field.to_string()));

            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    /// Name the template was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholder names referenced by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(field) => Some(field.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// 1-based line number of `offset` within `rest`, where `rest` is a suffix of `text`.
fn line_of(text: &str, rest: &str, offset: usize) -> usize {
    let consumed = text.len() - rest.len() + offset;
    text[..consumed].matches('\n').count() + 1
}
