// src/fips/mod.rs

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::Read, path::Path};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::text::decode_cp1252;

/// Census county class code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountyClass {
    /// Active county or equivalent not covered by C7 or H6.
    H1,
    /// Legally defined but inactive or nonfunctioning county.
    H4,
    /// Alaska census area.
    H5,
    /// County coextensive or consolidated with an incorporated place.
    H6,
    /// Independent city serving as its own county equivalent.
    C7,
    Other(String),
}

impl CountyClass {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "H1" => CountyClass::H1,
            "H4" => CountyClass::H4,
            "H5" => CountyClass::H5,
            "H6" => CountyClass::H6,
            "C7" => CountyClass::C7,
            other => CountyClass::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct County {
    pub name: String,
    pub class: CountyClass,
}

/// State and county FIPS codes from `national_county.txt`.
#[derive(Debug, Clone)]
pub struct FipsRegistry {
    counties: HashMap<(String, String), County>,
    states: HashMap<String, String>,
    state_codes: HashMap<String, String>,
    delimiter: u8,
    loaded: bool,
}

impl Default for FipsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FipsRegistry {
    pub fn new() -> Self {
        Self {
            counties: HashMap::new(),
            states: HashMap::new(),
            state_codes: HashMap::new(),
            delimiter: b',',
            loaded: false,
        }
    }

    /// Field delimiter of the FIPS file (default `,`).
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Parse `state, state FIPS, county FIPS, county name, class` rows
    /// (header skipped) in one pass.
    ///
    /// A state name must always carry the same code, and a code the same
    /// name; otherwise the load fails with `InconsistentMapping` and the
    /// registry stays empty. Loading an already loaded registry does nothing.
    #[instrument(level = "debug", skip(self, source))]
    pub fn load<R: Read>(&mut self, mut source: R) -> Result<()> {
        if self.loaded {
            debug!("FIPS registry already loaded, skipping");
            return Ok(());
        }
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let text = decode_cp1252(&bytes);

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let mut counties = HashMap::new();
        let mut states: HashMap<String, String> = HashMap::new();
        let mut state_codes: HashMap<String, String> = HashMap::new();

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            if record.len() < 5 {
                return Err(Error::RowShape {
                    context: format!("FIPS row {}", idx + 2),
                    len: record.len(),
                    needed: 5,
                });
            }
            let state = record[0].trim();
            let state_fp = record[1].trim();
            let county_fp = record[2].trim();

            insert_consistent(&mut state_codes, state, state_fp)?;
            insert_consistent(&mut states, state_fp, state)?;
            counties.insert(
                (state_fp.to_string(), county_fp.to_string()),
                County {
                    name: record[3].trim().to_string(),
                    class: CountyClass::from_code(&record[4]),
                },
            );
        }

        self.counties = counties;
        self.states = states;
        self.state_codes = state_codes;
        self.loaded = true;
        debug!(
            states = self.states.len(),
            counties = self.counties.len(),
            "loaded FIPS registry"
        );
        Ok(())
    }

    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.loaded {
            debug!("FIPS registry already loaded, skipping");
            return Ok(());
        }
        let file = File::open(path.as_ref())?;
        self.load(file)
    }

    pub fn state_name(&self, state_fips: &str) -> Option<&str> {
        self.states.get(state_fips).map(String::as_str)
    }

    pub fn state_fips(&self, state_name: &str) -> Option<&str> {
        self.state_codes.get(state_name).map(String::as_str)
    }

    pub fn county(&self, state_fips: &str, county_fips: &str) -> Option<&County> {
        self.counties
            .get(&(state_fips.to_string(), county_fips.to_string()))
    }

    pub fn county_name(&self, state_fips: &str, county_fips: &str) -> Option<&str> {
        self.county(state_fips, county_fips).map(|c| c.name.as_str())
    }

    /// State names sorted, e.g. for iterating every state's release.
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.state_codes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn insert_consistent(map: &mut HashMap<String, String>, key: &str, value: &str) -> Result<()> {
    match map.get(key) {
        Some(existing) if existing != value => Err(Error::InconsistentMapping {
            key: key.to_string(),
            existing: existing.clone(),
            conflicting: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            map.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}
