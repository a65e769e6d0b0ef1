// src/process/export.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Int64Builder, StringBuilder},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use std::{fs, fs::File, path::Path, sync::Arc};
use tracing::{debug, instrument};

use super::decode::DecodedRecord;
use crate::schema::{build_arrow_schema, TableDefinition};

/// Columnar batch of `records`: `logrecno`, `geoid`, then one Int64 column
/// per table column in line order.
pub fn records_to_batch(table: &TableDefinition, records: &[DecodedRecord]) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);

    let mut logrecno = StringBuilder::new();
    let mut geoid = StringBuilder::new();
    for rec in records {
        logrecno.append_value(&rec.log_record_number);
        geoid.append_option(rec.geographic_id.as_deref());
    }

    let mut cols: Vec<ArrayRef> = Vec::with_capacity(table.len() + 2);
    cols.push(Arc::new(logrecno.finish()));
    cols.push(Arc::new(geoid.finish()));

    for col in table.children() {
        let mut b = Int64Builder::with_capacity(records.len());
        for rec in records {
            b.append_option(rec.get(&col.table_id));
        }
        cols.push(Arc::new(b.finish()));
    }

    RecordBatch::try_new(schema, cols)
        .with_context(|| format!("building record batch for {}", table.id()))
}

/// Write `records` as one Parquet file at `out_path` (tmp file, then
/// rename). Returns the number of rows written.
#[instrument(level = "debug", skip(table, records), fields(table = %table.id(), rows = records.len()))]
pub fn write_parquet(table: &TableDefinition, records: &[DecodedRecord], out_path: &Path) -> Result<usize> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let batch = records_to_batch(table, records)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3)?))
        .set_dictionary_enabled(true)
        .build();

    let tmp_path = out_path.with_extension("parquet.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&tmp_path, out_path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), out_path.display()))?;
    debug!(path = %out_path.display(), "wrote parquet");
    Ok(batch.num_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableCatalog;
    use arrow::array::{Array, Int64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    const LOOKUP: &str = "File ID,Table ID,Sequence Number,Line Number,Start Position,Total Cells in Table,Total Cells in Sequence,Table Title,Subject Area\n\
        ACSSF,B25034,0104, ,7,2 CELLS, ,YEAR STRUCTURE BUILT,Housing\n\
        ACSSF,B25034,0104,1, , , ,Total,Housing\n\
        ACSSF,B25034,0104,2, , , ,Pre 1939,Housing\n";

    fn record(logrecno: &str, geoid: Option<&str>, total: Option<i64>, pre: Option<i64>) -> DecodedRecord {
        let mut fields = BTreeMap::new();
        fields.insert("B25034_001".to_string(), total);
        fields.insert("B25034_002".to_string(), pre);
        DecodedRecord {
            log_record_number: logrecno.to_string(),
            geographic_id: geoid.map(str::to_string),
            fields,
        }
    }

    #[test]
    fn batch_keeps_nulls() -> anyhow::Result<()> {
        let mut catalog = TableCatalog::new();
        catalog.load(LOOKUP.as_bytes())?;
        let table = catalog.get("B25034")?;

        let batch = records_to_batch(
            table,
            &[
                record("0000001", Some("06001400100"), Some(7), Some(3)),
                record("0000002", None, None, Some(1)),
            ],
        )?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.schema().field(2).name(), "B25034_001");

        let geoid = batch.column(1).as_any().downcast_ref::<StringArray>().expect("utf8");
        assert_eq!(geoid.value(0), "06001400100");
        assert!(geoid.is_null(1));

        let total = batch.column(2).as_any().downcast_ref::<Int64Array>().expect("int64");
        assert_eq!(total.value(0), 7);
        assert!(total.is_null(1));
        Ok(())
    }

    #[test]
    fn writes_readable_parquet() -> anyhow::Result<()> {
        let mut catalog = TableCatalog::new();
        catalog.load(LOOKUP.as_bytes())?;
        let table = catalog.get("B25034")?;

        let tmp = tempdir()?;
        let out = tmp.path().join("acs_B25034").join("ca.parquet");
        let n = write_parquet(table, &[record("0000001", Some("06001400100"), Some(7), Some(3))], &out)?;
        assert_eq!(n, 1);
        assert!(out.exists());
        assert!(!out.with_extension("parquet.tmp").exists());

        let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&out)?)?.build()?;
        let batch = reader.next().transpose()?.expect("one batch");
        assert_eq!(batch.num_rows(), 1);
        let pre = batch.column(3).as_any().downcast_ref::<Int64Array>().expect("int64");
        assert_eq!(pre.value(0), 3);
        Ok(())
    }
}
