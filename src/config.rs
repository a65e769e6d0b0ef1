// src/config.rs

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use tracing::debug;

use crate::error::Result;

/// Tables loaded when none are named.
pub const DEFAULT_TABLES: &[&str] = &[
    "B08303", "B01001", "B01002", "B01003", "B02001", "B03002", "B05001", "B07002", "B07009",
    "B07010", "B08006", "B08012", "B08119", "B08121", "B08124", "B08126", "B08134", "B08141",
    "B08301", "B08519", "B08521", "B08526", "B08601", "B09001", "B09002", "B13002", "B15001",
    "B15002", "B15003", "B17001", "B19001", "B19061", "B19083", "B19101", "B19301", "B24011",
    "B24121", "B25001", "B25002", "B25003", "B25004", "B25009", "B25010", "B25012", "B25014",
    "B25024", "B25026", "B25034", "B25038", "B25045", "B25046", "B25056", "B25061", "B25063",
    "B25064", "B25070", "B25075", "B25081", "B25087", "B25113", "B25115", "C24010",
];

/// Loader settings. Every field has a default, so a YAML file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory or `.zip` holding `e…txt` and `g…csv` summary files.
    pub data_dir: PathBuf,
    pub lookup_file: PathBuf,
    pub fips_file: PathBuf,
    pub out_dir: PathBuf,
    pub year: u16,
    pub span: u8,
    /// Two-letter state codes; empty means every state found in `data_dir`.
    pub states: Vec<String>,
    pub tables: Vec<String>,
    /// Field delimiter of all input files.
    pub delimiter: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lookup_file: PathBuf::from("data/Sequence_Number_and_Table_Number_Lookup.txt"),
            fips_file: PathBuf::from("data/national_county.txt"),
            out_dir: PathBuf::from("output"),
            year: 2012,
            span: 5,
            states: Vec::new(),
            tables: DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
            delimiter: ',',
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let cfg = Self::from_yaml(&text)?;
        debug!(path = %path.as_ref().display(), "loaded config");
        Ok(cfg)
    }

    /// Delimiter as the single byte the CSV readers take; non-ASCII falls
    /// back to `,`.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.year, 2012);
        assert_eq!(cfg.span, 5);
        assert_eq!(cfg.tables.len(), DEFAULT_TABLES.len());
        assert!(cfg.tables.iter().any(|t| t == "B25034"));
        assert_eq!(cfg.delimiter_byte(), b',');
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> anyhow::Result<()> {
        let cfg = Config::from_yaml(
            "year: 2013\nstates: [ca, ny]\ntables: [B19083]\ndelimiter: '|'\n",
        )?;
        assert_eq!(cfg.year, 2013);
        assert_eq!(cfg.span, 5);
        assert_eq!(cfg.states, vec!["ca", "ny"]);
        assert_eq!(cfg.tables, vec!["B19083"]);
        assert_eq!(cfg.delimiter_byte(), b'|');
        assert_eq!(cfg.out_dir, PathBuf::from("output"));
        Ok(())
    }

    #[test]
    fn bad_yaml_is_error() {
        assert!(Config::from_yaml("year: [").is_err());
    }
}
