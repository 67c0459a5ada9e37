//! Configuration loaded from `~/.config/jubbo/config.toml`.
//!
//! Every key is optional. A missing file yields [`Config::default`], which
//! renders with the standard Helvetica metrics, no QR payload, and the form
//! state stored next to other local data.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/jubbo/config.toml";
pub const DEFAULT_STATE_PATH: &str = "~/.local/share/jubbo/jubbo_form_v1.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {source}", .config_path.display())]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", .config_path.display())]
    Parse {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bulletin name used in export file names and the PDF title.
    pub title: String,
    pub state_path: PathBuf,
    pub output_dir: PathBuf,
    pub fonts: FontConfig,
    pub qr: QrConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "주보".to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            output_dir: PathBuf::from("."),
            fonts: FontConfig::default(),
            qr: QrConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// TrueType sources: a file path, a `data:` URI, or raw base64.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub regular: Option<String>,
    pub bold: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Pixels per point for PNG export.
    pub png_scale: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { png_scale: 4.0 }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.state_path = expand_path(&config.state_path);
        config.output_dir = expand_path(&config.output_dir);
        Ok(config)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        expand_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// The state path with `~` and `$VARS` expanded.
    pub fn resolved_state_path(&self) -> PathBuf {
        expand_path(&self.state_path)
    }

    /// Clamp values that would make export meaningless.
    pub fn png_scale(&self) -> f64 {
        let s = self.export.png_scale;
        if s.is_finite() && s > 0.0 {
            s.min(16.0)
        } else {
            ExportConfig::default().png_scale
        }
    }
}

/// Expand `~` and environment variables, leaving the path untouched when
/// expansion fails.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    match shellexpand::full(&path_str) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
