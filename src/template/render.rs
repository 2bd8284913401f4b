use super::{Segment, Template};
use crate::core::error::{Error, Result};
use crate::image::ImageDescriptor;
use std::path::Path;

/// Values substituted into a boot-entry template.
#[derive(Debug, Clone, Copy)]
pub struct EntryData<'a> {
    pub menu_title: &'a str,
    pub iso_path: &'a Path,
}

impl<'a> From<&'a ImageDescriptor> for EntryData<'a> {
    fn from(image: &'a ImageDescriptor) -> Self {
        Self {
            menu_title: &image.menu_title,
            iso_path: &image.path,
        }
    }
}

impl EntryData<'_> {
    fn lookup(&self, field: &str) -> Option<String> {
        match field.to_ascii_lowercase().as_str() {
            "menutitle" => Some(self.menu_title.to_string()),
            "isopath" => Some(self.iso_path.display().to_string()),
            _ => None,
        }
    }
}

/// Render one boot entry.
///
/// Fails if the template references anything other than `MenuTitle` or
/// `ISOPath`; the error names the image being rendered.
pub fn render(template: &Template, data: &EntryData<'_>) -> Result<String> {
    let mut out = String::new();

    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(field) => {
                let value = data.lookup(field).ok_or_else(|| {
                    Error::render(
                        data.iso_path,
                        format!(
                            "template `{}` references undefined placeholder `{}`",
                            template.name(),
                            field
                        ),
                    )
                })?;
                out.push_str(&value);
            }
        }
    }

    Ok(out)
}
