// src/survey.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `g<year:4><span:1><state:2>.csv`
static GEOGRAPHY_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^g(\d{4})(\d)([a-z]{2})\.csv$").expect("valid regex"));

/// One ACS release for one state: survey year, span in years (1, 3 or 5)
/// and two-letter state code. Summary files are named after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurveyKey {
    pub year: u16,
    pub span: u8,
    pub state: String,
}

impl SurveyKey {
    /// State codes are kept lowercase, as in the file names.
    pub fn new(year: u16, span: u8, state: &str) -> Self {
        Self {
            year,
            span,
            state: state.trim().to_lowercase(),
        }
    }

    /// Estimate file for `sequence_number`, e.g. `e20125ca0104000.txt`.
    pub fn sequence_file_name(&self, sequence_number: u32) -> String {
        format!(
            "e{:04}{:01}{}{:04}{:03}.txt",
            self.year, self.span, self.state, sequence_number, 0
        )
    }

    /// Geography file, e.g. `g20125ca.csv`.
    pub fn geography_file_name(&self) -> String {
        format!("g{:04}{:01}{}.csv", self.year, self.span, self.state)
    }

    /// Inverse of [`geography_file_name`](Self::geography_file_name).
    pub fn from_geography_file_name(name: &str) -> Option<Self> {
        let caps = GEOGRAPHY_FILE.captures(name)?;
        Some(Self::new(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            &caps[3],
        ))
    }
}

impl fmt::Display for SurveyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}yr/{}", self.year, self.span, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let key = SurveyKey::new(2012, 5, "CA");
        assert_eq!(key.state, "ca");
        assert_eq!(key.sequence_file_name(104), "e20125ca0104000.txt");
        assert_eq!(key.sequence_file_name(3), "e20125ca0003000.txt");
        assert_eq!(key.geography_file_name(), "g20125ca.csv");
        assert_eq!(key.to_string(), "2012/5yr/ca");
    }

    #[test]
    fn parses_geography_names() {
        assert_eq!(
            SurveyKey::from_geography_file_name("g20121ny.csv"),
            Some(SurveyKey::new(2012, 1, "ny"))
        );
        assert_eq!(
            SurveyKey::from_geography_file_name("G20125TX.CSV"),
            Some(SurveyKey::new(2012, 5, "tx"))
        );
        assert_eq!(SurveyKey::from_geography_file_name("e20125ca0104000.txt"), None);
        assert_eq!(SurveyKey::from_geography_file_name("g2012ca.csv"), None);
    }
}
