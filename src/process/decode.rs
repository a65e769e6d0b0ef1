// src/process/decode.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::geo::GeographyIndex;
use crate::schema::{field_offset, TableDefinition};
use crate::text::parse_cell;

/// 0-based column of the log record number in every sequence-file row.
pub const LOGRECNO_INDEX: usize = 5;

/// One sequence-file row sliced into a table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub log_record_number: String,
    pub geographic_id: Option<String>,
    /// Column id (`B25034_001`) → estimate; `None` for blank or
    /// non-numeric cells.
    pub fields: BTreeMap<String, Option<i64>>,
}

impl DecodedRecord {
    pub fn get(&self, column_id: &str) -> Option<i64> {
        self.fields.get(column_id).copied().flatten()
    }
}

/// Decodes rows of one sequence file holding (part of) `table`.
///
/// Column offsets are computed once up front, in line order.
#[derive(Debug)]
pub struct RowDecoder<'a> {
    table: &'a TableDefinition,
    sequence_number: u32,
    geography: Option<&'a GeographyIndex>,
    columns: Vec<(&'a str, usize)>,
    min_len: usize,
}

impl<'a> RowDecoder<'a> {
    /// Decoder for the table's first sequence file, which for most tables
    /// holds every column.
    pub fn new(table: &'a TableDefinition) -> Self {
        Self::for_sequence(table, table.sequence_number())
    }

    /// Decoder for the columns of `table` stored in `sequence_number`'s file.
    pub fn for_sequence(table: &'a TableDefinition, sequence_number: u32) -> Self {
        let columns: Vec<(&str, usize)> = table
            .children_in(sequence_number)
            .filter_map(|c| {
                let line = c.line_number?;
                let start = c.start_position?;
                Some((c.table_id.as_str(), field_offset(start, line)))
            })
            .collect();
        let min_len = columns
            .iter()
            .map(|(_, offset)| offset + 1)
            .chain(std::iter::once(LOGRECNO_INDEX + 1))
            .max()
            .unwrap_or(LOGRECNO_INDEX + 1);
        Self {
            table,
            sequence_number,
            geography: None,
            columns,
            min_len,
        }
    }

    /// Resolve each row's log record number against `geography`.
    pub fn with_geography(mut self, geography: &'a GeographyIndex) -> Self {
        self.geography = Some(geography);
        self
    }

    pub fn table(&self) -> &TableDefinition {
        self.table
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Shortest row this decoder accepts.
    pub fn min_row_len(&self) -> usize {
        self.min_len
    }

    /// Slice `row` into the table's columns.
    ///
    /// Cells that do not parse as integers decode to `None`. A row too short
    /// to hold every column is a `RowShape` error.
    pub fn decode<S: AsRef<str>>(&self, row: &[S]) -> Result<DecodedRecord> {
        if row.len() < self.min_len {
            return Err(Error::RowShape {
                context: format!("table {}", self.table.id()),
                len: row.len(),
                needed: self.min_len,
            });
        }

        let log_record_number = row[LOGRECNO_INDEX].as_ref().trim().to_string();
        let mut fields = BTreeMap::new();
        for (id, offset) in &self.columns {
            let raw = row[*offset].as_ref();
            let value = parse_cell(Some(raw));
            if value.is_none() {
                trace!(column = %id, raw, "cell is not an integer, leaving absent");
            }
            fields.insert((*id).to_string(), value);
        }

        let geographic_id = self
            .geography
            .and_then(|g| g.resolve(&log_record_number))
            .map(str::to_string);

        Ok(DecodedRecord {
            log_record_number,
            geographic_id,
            fields,
        })
    }
}
