use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{ColorError, FillColor, normalize_name};

const BUILTIN_PALETTE: &str = include_str!("../palettes/default.toml");

#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("failed to parse palette TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("palette entry for {names:?}: {source}")]
    InvalidEntry {
        names: Vec<String>,
        #[source]
        source: ColorError,
    },
}

/// One fill and every name that maps to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub hex: String,
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PaletteFile {
    #[serde(default)]
    colors: Vec<PaletteEntry>,
}

/// Immutable name to colour table. Keys are stored normalized.
#[derive(Debug, Clone)]
pub struct ColorTable {
    by_name: IndexMap<String, FillColor>,
}

impl ColorTable {
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_PALETTE).expect("built-in palette must parse")
    }

    pub fn from_toml(content: &str) -> Result<Self, PaletteError> {
        let file: PaletteFile = toml::from_str(content)?;
        Self::from_entries(&file.colors)
    }

    pub fn from_entries(entries: &[PaletteEntry]) -> Result<Self, PaletteError> {
        ColorTable {
            by_name: IndexMap::new(),
        }
        .with_entries(entries)
    }

    /// Layers `entries` over this table; a later name replaces an earlier one.
    pub fn with_entries(mut self, entries: &[PaletteEntry]) -> Result<Self, PaletteError> {
        for entry in entries {
            let color =
                FillColor::parse(entry.hex.trim()).map_err(|source| PaletteError::InvalidEntry {
                    names: entry.names.clone(),
                    source,
                })?;
            for name in &entry.names {
                let key = normalize_name(name);
                if !key.is_empty() {
                    self.by_name.insert(key, color);
                }
            }
        }
        Ok(self)
    }

    /// Looks up an already-normalized name.
    pub fn get(&self, name: &str) -> Option<&FillColor> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FillColor)> {
        self.by_name.iter().map(|(name, color)| (name.as_str(), color))
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_palette_has_french_and_english_synonyms() {
        let table = ColorTable::builtin();
        assert_eq!(table.get("BLEUE"), table.get("BLUE"));
        assert_eq!(table.get("VERTE").map(ToString::to_string).as_deref(), Some("#008200"));
        assert_eq!(table.get("ROSE").map(ToString::to_string).as_deref(), Some("#ffc0cb"));
        assert!(table.get("ORANGE FLUO").is_some());
    }

    #[test]
    fn user_entries_override_and_extend() {
        let table = ColorTable::builtin()
            .with_entries(&[
                PaletteEntry {
                    hex: "#40E0D0".to_string(),
                    names: vec!["turquoise".to_string()],
                },
                PaletteEntry {
                    hex: "#111111".to_string(),
                    names: vec!["Noire".to_string()],
                },
            ])
            .expect("valid entries");

        assert_eq!(table.get("TURQUOISE").map(ToString::to_string).as_deref(), Some("#40e0d0"));
        assert_eq!(table.get("NOIRE").map(ToString::to_string).as_deref(), Some("#111111"));
        assert_eq!(table.get("NOIR").map(ToString::to_string).as_deref(), Some("#000000"));
    }

    #[test]
    fn invalid_hex_in_palette_is_reported() {
        let err = ColorTable::from_toml(
            r##"
[[colors]]
hex = "red"
names = ["ROUGE"]
"##,
        )
        .unwrap_err();
        assert!(matches!(err, PaletteError::InvalidEntry { .. }));
    }
}
