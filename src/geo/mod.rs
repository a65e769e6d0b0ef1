// src/geo/mod.rs

use csv::ReaderBuilder;
use std::{collections::HashMap, io::Read};
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::survey::SurveyKey;
use crate::text::decode_cp1252;

/// 0-based column of the log record number in a geography row.
pub const LOGRECNO_INDEX: usize = 4;
/// 0-based column of the GEOID (`14000US06001400100`).
pub const GEOID_INDEX: usize = 48;
/// Country token that precedes the numeric GEOID.
const COUNTRY_TOKEN: &str = "US";

/// Log record number → GEOID for one (year, span, state) release.
///
/// Built per request and dropped once its sequence files are decoded; do not
/// reuse across releases, log record numbers are only unique within one.
#[derive(Debug, Clone)]
pub struct GeographyIndex {
    key: Option<SurveyKey>,
    geoids: HashMap<String, String>,
}

impl GeographyIndex {
    /// Parse a geography file (no header row).
    ///
    /// A log record number seen twice keeps the last GEOID: repeated
    /// numbers are an artifact of how releases are cut, not an error.
    #[instrument(level = "debug", skip(source))]
    pub fn load<R: Read>(mut source: R, delimiter: u8) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let text = decode_cp1252(&bytes);

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut geoids = HashMap::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let (Some(logrecno), Some(geoid)) = (record.get(LOGRECNO_INDEX), record.get(GEOID_INDEX))
            else {
                return Err(Error::RowShape {
                    context: format!("geography row {}", idx + 1),
                    len: record.len(),
                    needed: GEOID_INDEX + 1,
                });
            };
            if let Some(prev) = geoids.insert(logrecno.trim().to_string(), geoid.trim().to_string()) {
                trace!(logrecno, prev = %prev, "log record number repeated, last wins");
            }
        }
        debug!(entries = geoids.len(), "loaded geography");
        Ok(Self { key: None, geoids })
    }

    /// Tag the index with the release it was built from.
    pub fn with_key(mut self, key: SurveyKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn key(&self) -> Option<&SurveyKey> {
        self.key.as_ref()
    }

    /// GEOID for `log_record_number` with the country token stripped, or
    /// `None` when the number is unknown or its GEOID is blank.
    pub fn resolve(&self, log_record_number: &str) -> Option<&str> {
        let raw = self.geoids.get(log_record_number.trim())?;
        let id = match raw.split_once(COUNTRY_TOKEN) {
            Some((_, rest)) => rest,
            None => raw.as_str(),
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn len(&self) -> usize {
        self.geoids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoids.is_empty()
    }
}
