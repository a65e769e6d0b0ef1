//! Readers for American Community Survey (ACS) summary files.
//!
//! The ACS ships thousands of estimate columns split across many
//! "sequence" files per state. [`schema::TableCatalog`] decodes the
//! sequence/table lookup file into table definitions, [`geo::GeographyIndex`]
//! joins log record numbers to Census GEOIDs, [`process::RowDecoder`] slices
//! raw sequence rows into typed [`process::DecodedRecord`]s, and
//! [`fips::FipsRegistry`] maps state and county FIPS codes to names.

pub mod config;
pub mod error;
pub mod fips;
pub mod geo;
pub mod process;
pub mod schema;
pub mod survey;
pub mod text;

pub use error::{Error, Result};
