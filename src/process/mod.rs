// src/process/mod.rs
pub mod decode;
pub mod export;
pub mod source;

pub use decode::{DecodedRecord, RowDecoder};
pub use source::DataSource;

use csv::ReaderBuilder;
use std::{
    borrow::Cow,
    collections::HashMap,
    io::{Cursor, Read},
};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::geo::GeographyIndex;
use crate::schema::TableDefinition;
use crate::survey::SurveyKey;

/// Decoded rows of one table from one sequence file.
#[derive(Debug, Default)]
pub struct TableRows {
    pub records: Vec<DecodedRecord>,
    /// Rows dropped because they were too short for the table.
    pub skipped: usize,
}

/// Load the geography index for `key` from `source`.
#[instrument(level = "info", skip(key, source), fields(key = %key))]
pub fn load_geography(key: &SurveyKey, source: &DataSource, delimiter: u8) -> Result<GeographyIndex> {
    let name = key.geography_file_name();
    let bytes = source.read(&name)?;
    let geo = GeographyIndex::load(Cursor::new(bytes), delimiter)?.with_key(key.clone());
    info!(file = %name, entries = geo.len(), "loaded geography");
    Ok(geo)
}

/// Decode every row of a sequence file with `decoder`.
///
/// Rows are read as bytes, so a cell that is not UTF-8 decodes as absent.
/// Rows too short for the table are logged and counted, not fatal; CSV
/// errors abort the file.
pub fn decode_sequence<R: Read>(
    reader: R,
    decoder: &RowDecoder<'_>,
    delimiter: u8,
) -> Result<TableRows> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut out = TableRows::default();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result?;
        let row: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();
        match decoder.decode(&row) {
            Ok(rec) => out.records.push(rec),
            Err(Error::RowShape { context, len, needed }) => {
                warn!(row = idx + 1, %context, len, needed, "skipping short row");
                out.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Read `table` for one release: open the sequence file of each segment of
/// the table and decode every row, resolving GEOIDs through `geography`
/// when given.
///
/// Rows of later segments merge into the record with the same log record
/// number; a log record number missing from earlier files gets a record of
/// its own.
#[instrument(level = "info", skip(table, key, source, geography), fields(table = %table.id(), key = %key))]
pub fn read_table(
    table: &TableDefinition,
    key: &SurveyKey,
    source: &DataSource,
    geography: Option<&GeographyIndex>,
    delimiter: u8,
) -> Result<TableRows> {
    let mut out = TableRows::default();
    let mut by_logrecno: HashMap<String, usize> = HashMap::new();

    for seq in table.sequence_numbers() {
        let name = key.sequence_file_name(seq);
        info!(file = %name, "loading ACS data");
        let bytes = source.read(&name)?;

        let mut decoder = RowDecoder::for_sequence(table, seq);
        if let Some(geo) = geography {
            decoder = decoder.with_geography(geo);
        }
        let rows = decode_sequence(Cursor::new(bytes), &decoder, delimiter)?;
        debug!(seq, records = rows.records.len(), skipped = rows.skipped, "decoded sequence file");

        out.skipped += rows.skipped;
        for rec in rows.records {
            match by_logrecno.get(&rec.log_record_number) {
                Some(&idx) => out.records[idx].fields.extend(rec.fields),
                None => {
                    by_logrecno.insert(rec.log_record_number.clone(), out.records.len());
                    out.records.push(rec);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableCatalog;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,acskit::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const LOOKUP: &str = "File ID,Table ID,Sequence Number,Line Number,Start Position,Total Cells in Table,Total Cells in Sequence,Table Title,Subject Area\n\
        ACSSF,B25034,0104, ,7,2 CELLS, ,YEAR STRUCTURE BUILT,Housing\n\
        ACSSF,B25034,0104,1, , , ,Total,Housing\n\
        ACSSF,B25034,0104,2, , , ,Pre 1939,Housing\n";

    fn geo_row(logrecno: &str, geoid: &str) -> String {
        let mut fields = vec![String::new(); 49];
        fields[4] = logrecno.into();
        fields[48] = geoid.into();
        fields.join(",")
    }

    #[test]
    fn reads_table_from_directory() -> anyhow::Result<()> {
        init_test_logging();
        let mut catalog = TableCatalog::new();
        catalog.load(LOOKUP.as_bytes())?;
        let table = catalog.get("B25034")?;

        let tmp = tempdir()?;
        let key = SurveyKey::new(2012, 5, "ca");
        fs::write(
            tmp.path().join(key.geography_file_name()),
            format!(
                "{}\n{}\n",
                geo_row("0000001", "14000US06001400100"),
                geo_row("0000002", "14000US06001400200")
            ),
        )?;
        fs::write(
            tmp.path().join(key.sequence_file_name(104)),
            "ACSSF,2012e5,ca,000,0104,0000001,120,15\n\
             ACSSF,2012e5,ca,000,0104,0000002, ,4\n\
             ACSSF,2012e5,ca,000,0104,0000003\n\
             ACSSF,2012e5,ca,000,0104,0000004,9,1\n",
        )?;

        let source = DataSource::open(tmp.path());
        let geo = load_geography(&key, &source, b',')?;
        let rows = read_table(table, &key, &source, Some(&geo), b',')?;

        assert_eq!(rows.records.len(), 3);
        assert_eq!(rows.skipped, 1);

        let first = &rows.records[0];
        assert_eq!(first.log_record_number, "0000001");
        assert_eq!(first.geographic_id.as_deref(), Some("06001400100"));
        assert_eq!(first.get("B25034_001"), Some(120));
        assert_eq!(first.get("B25034_002"), Some(15));

        let second = &rows.records[1];
        assert_eq!(second.get("B25034_001"), None);
        assert_eq!(second.get("B25034_002"), Some(4));

        let last = &rows.records[2];
        assert_eq!(last.geographic_id, None);
        Ok(())
    }

    #[test]
    fn undecodable_cell_is_absent() -> anyhow::Result<()> {
        init_test_logging();
        let mut catalog = TableCatalog::new();
        catalog.load(LOOKUP.as_bytes())?;
        let decoder = RowDecoder::new(catalog.get("B25034")?);

        let data: &[u8] = b"ACSSF,2012e5,ca,000,0104,0000001,120,15\n\
            ACSSF,2012e5,ca,000,0104,0000002,\xff12,4\n\
            ACSSF,2012e5,ca,000,0104,0000003,9,1\n";
        let rows = decode_sequence(data, &decoder, b',')?;

        assert_eq!(rows.skipped, 0);
        assert_eq!(rows.records.len(), 3);
        assert_eq!(rows.records[1].log_record_number, "0000002");
        assert_eq!(rows.records[1].fields.get("B25034_001"), Some(&None));
        assert_eq!(rows.records[1].get("B25034_002"), Some(4));
        assert_eq!(rows.records[2].get("B25034_001"), Some(9));
        Ok(())
    }

    #[test]
    fn split_table_merges_sequence_files() -> anyhow::Result<()> {
        init_test_logging();
        let mut catalog = TableCatalog::new();
        catalog.load(
            "File ID,Table ID,Sequence Number,Line Number,Start Position,Total Cells in Table,Total Cells in Sequence,Table Title,Subject Area\n\
             ACSSF,B24121,0089, ,8,3 CELLS, ,MEDIAN EARNINGS,Occupation\n\
             ACSSF,B24121,0089,1, , , ,Total:,Occupation\n\
             ACSSF,B24121,0090, ,6,3 CELLS, ,MEDIAN EARNINGS,Occupation\n\
             ACSSF,B24121,0090,2, , , ,Chief executives,Occupation\n\
             ACSSF,B24121,0090,3, , , ,Legislators,Occupation\n"
                .as_bytes(),
        )?;
        let table = catalog.get("B24121")?;

        let tmp = tempdir()?;
        let key = SurveyKey::new(2012, 5, "ca");
        fs::write(
            tmp.path().join(key.sequence_file_name(89)),
            "ACSSF,2012e5,ca,000,0089,0000001,xx,41000\n\
             ACSSF,2012e5,ca,000,0089,0000002,xx,38000\n",
        )?;
        fs::write(
            tmp.path().join(key.sequence_file_name(90)),
            "ACSSF,2012e5,ca,000,0090,0000002,98000,52000\n\
             ACSSF,2012e5,ca,000,0090,0000001,97000,51000\n\
             ACSSF,2012e5,ca,000,0090,0000003,1,2\n",
        )?;

        let rows = read_table(table, &key, &DataSource::open(tmp.path()), None, b',')?;
        assert_eq!(rows.skipped, 0);
        assert_eq!(rows.records.len(), 3);

        let first = &rows.records[0];
        assert_eq!(first.log_record_number, "0000001");
        assert_eq!(first.get("B24121_001"), Some(41000));
        assert_eq!(first.get("B24121_002"), Some(97000));
        assert_eq!(first.get("B24121_003"), Some(51000));

        let second = &rows.records[1];
        assert_eq!(second.get("B24121_001"), Some(38000));
        assert_eq!(second.get("B24121_003"), Some(52000));

        let only_later = &rows.records[2];
        assert_eq!(only_later.log_record_number, "0000003");
        assert_eq!(only_later.get("B24121_001"), None);
        assert_eq!(only_later.get("B24121_002"), Some(1));
        Ok(())
    }

    #[test]
    fn missing_sequence_file_is_error() -> anyhow::Result<()> {
        let mut catalog = TableCatalog::new();
        catalog.load(LOOKUP.as_bytes())?;
        let tmp = tempdir()?;
        let source = DataSource::open(tmp.path());
        let err = read_table(
            catalog.get("B25034")?,
            &SurveyKey::new(2012, 5, "ca"),
            &source,
            None,
            b',',
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingFile(name) if name == "e20125ca0104000.txt"));
        Ok(())
    }
}
