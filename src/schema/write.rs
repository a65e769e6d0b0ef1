// src/schema/write.rs

use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::catalog::TableCatalog;
use crate::error::Result;

/// One row of the flattened table listing: tables and their columns alike.
#[derive(Debug, Serialize, PartialEq)]
pub struct MetaEntry<'a> {
    pub acstable: &'a str,
    pub title: &'a str,
    pub subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe: Option<&'a str>,
}

/// Every table followed by its columns, in id order.
pub fn meta_entries(catalog: &TableCatalog) -> Vec<MetaEntry<'_>> {
    let mut out = Vec::new();
    for table in catalog.tables() {
        out.push(MetaEntry {
            acstable: table.id(),
            title: table.title(),
            subject: table.subject(),
            universe: table.universe.as_deref(),
        });
        for col in table.children() {
            out.push(MetaEntry {
                acstable: &col.table_id,
                title: &col.title,
                subject: &col.subject,
                universe: None,
            });
        }
    }
    out
}

/// Write `acsmeta.json` into `dir`: to a tmp file, then rename over.
pub fn write_catalog<P: AsRef<Path>>(catalog: &TableCatalog, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join("acsmeta.json");
    let tmp_path = dir.join(".acsmeta.json.tmp");

    let entries = meta_entries(catalog);
    let mut tmp = fs::File::create(&tmp_path)?;
    serde_json::to_writer_pretty(&mut tmp, &entries)?;
    tmp.write_all(b"\n")?;
    drop(tmp);

    fs::rename(&tmp_path, &path)?;
    debug!(entries = entries.len(), path = %path.display(), "wrote catalog");
    Ok(path)
}
