//! Structured error types for the bulletin renderer.
//!
//! Parsing, configuration, fonts, file I/O and export each get a variant.
//! The overflow distributor never fails, so nothing here describes it.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// The unified error type returned by all public jubbo API functions.
#[derive(Debug, Error)]
pub enum JubboError {
    /// A form state document failed to parse.
    #[error("Failed to parse form state: {source}{}", format_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },
    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    Font(String),
    /// Layout, PDF or PNG generation failed.
    #[error("Render error: {0}")]
    Render(String),
    /// The QR code payload could not be encoded.
    #[error("QR error: {0}")]
    Qr(String),
    /// Reading or writing a file failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl JubboError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JubboError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for JubboError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the form state schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the file truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        JubboError::Parse { source: e, hint }
    }
}
