use std::path::PathBuf;

/// Result type alias for bootable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bootable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A template source could not be read, a template is malformed, or a
    /// reserved template (`header`, `generic`) is missing.
    #[error("Template load error ({name}): {reason}")]
    TemplateLoad { name: String, reason: String },

    /// A template referenced data that is not supplied for an entry.
    #[error("Failed to render entry for {}: {reason}", .image.display())]
    Render { image: PathBuf, reason: String },

    /// A construction step was invoked out of order.
    #[error("Invalid state: cannot {step} while builder is {state}")]
    InvalidState {
        step: &'static str,
        state: &'static str,
    },

    /// An external program failed to run or exited unsuccessfully.
    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    /// IO error tied to a specific path.
    #[error("IO error on {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a template load error for the named template.
    pub fn template_load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::TemplateLoad {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a render error for the given image.
    pub fn render(image: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Render {
            image: image.into(),
            reason: reason.into(),
        }
    }

    /// Create a command error.
    pub fn command(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Command {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an IO error with the path it happened on.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}
