use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::palette::{ColorTable, PaletteEntry, PaletteError};

/// Disc radius in page units (millimetres on A4).
pub const DEFAULT_RADIUS: f64 = 69.5;
pub const DEFAULT_TITLE_FONT_SIZE: f64 = 14.0;
pub const DEFAULT_GRADE_FONT_SIZE: f64 = 18.0;
pub const DEFAULT_SETTER_FONT_SIZE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid chart option {name} = {value}: expected a finite number above zero")]
pub struct InvalidOption {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(
        default = "default_title_font_size",
        alias = "titleFontSize",
        alias = "title_fs"
    )]
    pub title_font_size: f64,
    #[serde(
        default = "default_grade_font_size",
        alias = "gradeFontSize",
        alias = "grade_fs"
    )]
    pub grade_font_size: f64,
    #[serde(
        default = "default_setter_font_size",
        alias = "setterFontSize",
        alias = "setter_fs"
    )]
    pub setter_font_size: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS
}
fn default_title_font_size() -> f64 {
    DEFAULT_TITLE_FONT_SIZE
}
fn default_grade_font_size() -> f64 {
    DEFAULT_GRADE_FONT_SIZE
}
fn default_setter_font_size() -> f64 {
    DEFAULT_SETTER_FONT_SIZE
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            title_font_size: DEFAULT_TITLE_FONT_SIZE,
            grade_font_size: DEFAULT_GRADE_FONT_SIZE,
            setter_font_size: DEFAULT_SETTER_FONT_SIZE,
        }
    }
}

impl ChartOptions {
    pub fn validate(&self) -> Result<(), InvalidOption> {
        let fields = [
            ("radius", self.radius),
            ("title_font_size", self.title_font_size),
            ("grade_font_size", self.grade_font_size),
            ("setter_font_size", self.setter_font_size),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(InvalidOption { name, value });
            }
        }
        Ok(())
    }
}

/// Everything a config file may carry: chart sizes and extra palette names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chart: ChartOptions,
    #[serde(default)]
    pub colors: Vec<PaletteEntry>,
}

impl Config {
    /// Reads a config file. `.json` is parsed as JSON; anything else is tried
    /// as TOML first, then YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            return Self::from_json(&content).map_err(parse_error);
        }

        match Self::from_toml(&content) {
            Ok(config) => Ok(config),
            Err(toml_err) => Self::from_yaml(&content)
                .map_err(|yaml_err| parse_error(format!("{toml_err}; {yaml_err}"))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("not valid TOML: {e}"))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("not valid YAML: {e}"))
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("not valid JSON: {e}"))
    }

    /// Built-in palette with this config's entries layered on top.
    pub fn color_table(&self) -> Result<ColorTable, PaletteError> {
        ColorTable::builtin().with_entries(&self.colors)
    }
}
