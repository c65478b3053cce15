//! Site settings for the chart header.
//!
//! Settings live in a small JSON file:
//!
//! ```text
//! {"heading": "Department of Paediatrics", "subheading": "Ward 5", "font_size": 9,
//!  "logo_path": "default_logo.png"}
//! ```
//!
//! The file is read once per chart, giving each render a read-only snapshot. Heading and
//! subheading are kept as raw JSON values; the composer rejects anything that is not a string.
//! `logo_path` replaces the configured fallback logo for that chart; a relative path is taken
//! from the settings file's directory. An uploaded site logo still takes precedence.

use crate::constants::{DEFAULT_FONT_SIZE, DEFAULT_HEADING};
use crate::{ChartError, ChartResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSettings {
    #[serde(default = "default_heading")]
    pub heading: Value,
    #[serde(default = "default_subheading")]
    pub subheading: Value,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
}

fn default_heading() -> Value {
    Value::String(DEFAULT_HEADING.to_string())
}

fn default_subheading() -> Value {
    Value::String(String::new())
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            subheading: default_subheading(),
            font_size: default_font_size(),
            logo_path: None,
        }
    }
}

/// Reads [`ChartSettings`] from a JSON file.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the current settings.
    ///
    /// A missing file yields [`ChartSettings::default`]. A blank `logo_path` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::FileRead` if the file exists but cannot be read,
    /// `ChartError::Settings` if it is not valid settings JSON, and `ChartError::InvalidInput`
    /// if the font size is zero.
    pub fn load(&self) -> ChartResult<ChartSettings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file; using defaults");
                return Ok(ChartSettings::default());
            }
            Err(source) => {
                return Err(ChartError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut settings: ChartSettings =
            serde_json::from_str(&contents).map_err(|source| ChartError::Settings {
                path: self.path.clone(),
                source,
            })?;

        if settings.font_size == 0 {
            return Err(ChartError::InvalidInput(format!(
                "font_size in {} must be positive",
                self.path.display()
            )));
        }

        settings.logo_path = settings
            .logo_path
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| match self.path.parent() {
                Some(dir) if p.is_relative() => dir.join(p),
                _ => p,
            });

        Ok(settings)
    }
}
