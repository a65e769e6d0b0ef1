// src/error.rs

use std::io;
use thiserror::Error;

/// Errors raised while loading reference files or decoding summary rows.
///
/// Blank or non-numeric data cells and unresolved geography ids are *not*
/// errors; they decode to `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested table id is not in the catalog.
    #[error("unknown ACS table: {0}")]
    UnknownTable(String),

    /// A child line references a table that no header row registered.
    #[error("line {line} of table `{table}` has no parent table definition")]
    MissingParent { table: String, line: u32 },

    /// A row is too short for the fields it is supposed to carry.
    /// Callers iterating a file usually skip the row and move on.
    #[error("{context}: row has {len} fields, needs at least {needed}")]
    RowShape {
        context: String,
        len: usize,
        needed: usize,
    },

    /// The same key maps to two different values across rows.
    #[error("`{key}` maps to both `{existing}` and `{conflicting}`")]
    InconsistentMapping {
        key: String,
        existing: String,
        conflicting: String,
    },

    /// Lookup row that cannot describe a table or column.
    #[error("malformed lookup row {row}: {reason}")]
    MalformedLookup { row: usize, reason: String },

    /// Named summary file is not present in the data source.
    #[error("file `{0}` not found in data source")]
    MissingFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
