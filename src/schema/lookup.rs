// src/schema/lookup.rs

use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::text::{decode_cp1252, non_blank};

/// `"10 CELLS"` → 10.
static CELL_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)").expect("valid regex"));

/// Columns: File ID, Table ID, Sequence Number, Line Number, Start Position,
/// Total Cells in Table, Total Cells in Sequence, Table Title, Subject Area.
const LOOKUP_FIELDS: usize = 9;

/// What a lookup row describes, decided by which positional fields are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// No line number, has a start position.
    Table { start_position: u32 },
    /// No line number, no start position: the `Universe:` caption.
    Universe,
    /// Fractional line number (`0.5`): a heading without a data cell.
    Heading,
    /// Integer line number: one data column.
    Column(u32),
}

/// One typed row of the lookup file.
#[derive(Debug, Clone)]
pub(crate) struct LookupRow {
    pub row: usize,
    pub table_id: String,
    pub sequence_number: u32,
    pub kind: LineKind,
    pub cell_count: Option<u32>,
    pub title: String,
    pub subject: String,
}

/// Read every row of a lookup file, skipping the header.
#[instrument(level = "debug", skip(source))]
pub(crate) fn read_lookup<R: Read>(mut source: R, delimiter: u8) -> Result<Vec<LookupRow>> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    let text = decode_cp1252(&bytes);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        // header is row 1
        let row = idx + 2;
        if record.iter().all(|f| f.trim().is_empty()) {
            trace!(row, "skipping blank lookup row");
            continue;
        }
        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        rows.push(parse_row(row, &fields)?);
    }
    debug!(rows = rows.len(), "read lookup rows");
    Ok(rows)
}

fn parse_row(row: usize, fields: &[&str]) -> Result<LookupRow> {
    if fields.len() < LOOKUP_FIELDS {
        return Err(malformed(
            row,
            format!("expected {} fields, found {}", LOOKUP_FIELDS, fields.len()),
        ));
    }

    let table_id = non_blank(fields[1])
        .ok_or_else(|| malformed(row, "missing table id"))?
        .to_string();
    let sequence_number = non_blank(fields[2])
        .ok_or_else(|| malformed(row, "missing sequence number"))?
        .parse::<u32>()
        .map_err(|e| malformed(row, format!("sequence number `{}`: {}", fields[2], e)))?;

    let start_position = match non_blank(fields[4]) {
        None => None,
        Some(v) => match v.parse::<u32>() {
            Ok(0) => return Err(malformed(row, "start position 0")),
            Ok(n) => Some(n),
            Err(e) => return Err(malformed(row, format!("start position `{}`: {}", v, e))),
        },
    };

    let kind = match non_blank(fields[3]) {
        None => match start_position {
            Some(start_position) => LineKind::Table { start_position },
            None => LineKind::Universe,
        },
        Some(v) => parse_line_number(row, v)?,
    };

    let cell_count = non_blank(fields[5])
        .and_then(|v| CELL_COUNT.captures(v))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    trace!(row, table = %table_id, kind = ?kind, "parsed lookup row");
    Ok(LookupRow {
        row,
        table_id,
        sequence_number,
        kind,
        cell_count,
        title: fields[7].to_string(),
        subject: fields[8].to_string(),
    })
}

fn parse_line_number(row: usize, v: &str) -> Result<LineKind> {
    if let Ok(n) = v.parse::<u32>() {
        if n == 0 {
            return Err(malformed(row, "line number 0"));
        }
        return Ok(LineKind::Column(n));
    }
    match v.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 && f.fract() != 0.0 => Ok(LineKind::Heading),
        _ => Err(malformed(row, format!("line number `{}`", v))),
    }
}

fn malformed(row: usize, reason: impl Into<String>) -> Error {
    Error::MalformedLookup {
        row,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "File ID,Table ID,Sequence Number,Line Number,Start Position,Total Cells in Table,Total Cells in Sequence,Table Title,Subject Area\n";

    fn read(body: &str) -> Result<Vec<LookupRow>> {
        read_lookup(format!("{}{}", HEADER, body).as_bytes(), b',')
    }

    #[test]
    fn classifies_rows() -> anyhow::Result<()> {
        let rows = read(
            "ACSSF,B25034,0104, ,7,10 CELLS, ,YEAR STRUCTURE BUILT,Housing\n\
             ACSSF,B25034,0104, , , , ,Universe:  Housing units,Housing\n\
             ACSSF,B25034,0104,0.5, , , ,Built:,Housing\n\
             ACSSF,B25034,0104,1, , , ,Total:,Housing\n",
        )?;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].kind, LineKind::Table { start_position: 7 });
        assert_eq!(rows[0].sequence_number, 104);
        assert_eq!(rows[0].cell_count, Some(10));
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[1].kind, LineKind::Universe);
        assert_eq!(rows[2].kind, LineKind::Heading);
        assert_eq!(rows[3].kind, LineKind::Column(1));
        assert_eq!(rows[3].title, "Total:");
        Ok(())
    }

    #[test]
    fn blank_fields_are_absent_not_zero() -> anyhow::Result<()> {
        let rows = read("ACSSF,B01003,0003,   ,  , , ,TOTAL POPULATION,Age-Sex\n")?;
        assert_eq!(rows[0].kind, LineKind::Universe);
        assert_eq!(rows[0].cell_count, None);
        Ok(())
    }

    #[test]
    fn rejects_short_and_bad_rows() {
        assert!(matches!(
            read("ACSSF,B25034,0104\n"),
            Err(Error::MalformedLookup { row: 2, .. })
        ));
        assert!(matches!(
            read("ACSSF,B25034,XX, ,7,1 CELL, ,T,S\n"),
            Err(Error::MalformedLookup { .. })
        ));
        assert!(matches!(
            read("ACSSF,B25034,0104,abc, , , ,T,S\n"),
            Err(Error::MalformedLookup { .. })
        ));
        assert!(matches!(
            read("ACSSF,B25034,0104, ,0,1 CELL, ,T,S\n"),
            Err(Error::MalformedLookup { .. })
        ));
    }

    #[test]
    fn honours_delimiter() -> anyhow::Result<()> {
        let text = "a|b|c|d|e|f|g|h|i\nACSSF|B19083|0059| |7|1 CELL| |GINI INDEX|Income\n";
        let rows = read_lookup(text.as_bytes(), b'|')?;
        assert_eq!(rows[0].table_id, "B19083");
        assert_eq!(rows[0].kind, LineKind::Table { start_position: 7 });
        Ok(())
    }
}
