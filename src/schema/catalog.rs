// src/schema/catalog.rs

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fs::File,
    io::Read,
    path::Path,
};
use tracing::{debug, instrument, trace, warn};

use super::lookup::{read_lookup, LineKind, LookupRow};
use super::types::{column_id, ColumnDefinition, TableDefinition};
use crate::error::{Error, Result};
use crate::text::title_case;

/// All ACS table definitions, keyed by lowercase table id.
///
/// Loaded once from `Sequence_Number_and_Table_Number_Lookup.txt` and
/// read-only afterwards; share it by reference.
#[derive(Debug, Clone)]
pub struct TableCatalog {
    tables: BTreeMap<String, TableDefinition>,
    delimiter: u8,
    loaded: bool,
}

impl Default for TableCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TableCatalog {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            delimiter: b',',
            loaded: false,
        }
    }

    /// Field delimiter of the lookup file (default `,`).
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Parse a lookup file into this catalog.
    ///
    /// Tables are registered in a first pass and columns attached in a
    /// second, so child rows may appear anywhere in the file. Calling this on
    /// a catalog that is already loaded does nothing. On error the catalog is
    /// left empty and unloaded.
    #[instrument(level = "debug", skip(self, source))]
    pub fn load<R: Read>(&mut self, source: R) -> Result<()> {
        if self.loaded {
            debug!("table catalog already loaded, skipping");
            return Ok(());
        }
        let rows = read_lookup(source, self.delimiter)?;
        self.tables = build_tables(rows)?;
        self.loaded = true;
        debug!(tables = self.tables.len(), "loaded table catalog");
        Ok(())
    }

    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.loaded {
            debug!("table catalog already loaded, skipping");
            return Ok(());
        }
        let file = File::open(path.as_ref())?;
        self.load(file)
    }

    /// Look up a table by id, ignoring case.
    pub fn get(&self, table_id: &str) -> Result<&TableDefinition> {
        self.tables
            .get(&table_id.to_lowercase())
            .ok_or_else(|| Error::UnknownTable(table_id.to_string()))
    }

    /// Tables sorted by id.
    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn build_tables(rows: Vec<LookupRow>) -> Result<BTreeMap<String, TableDefinition>> {
    let mut tables: BTreeMap<String, TableDefinition> = BTreeMap::new();

    // 1) register every table header
    for row in &rows {
        if let LineKind::Table { start_position } = row.kind {
            let def = ColumnDefinition {
                table_id: row.table_id.clone(),
                sequence_number: row.sequence_number,
                line_number: None,
                start_position: Some(start_position),
                cell_count: row.cell_count,
                title: title_case(&row.title),
                subject: row.subject.clone(),
            };
            match tables.entry(row.table_id.to_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(TableDefinition::new(def, start_position));
                }
                Entry::Occupied(mut slot) => {
                    let table = slot.get_mut();
                    if table.add_segment(row.sequence_number, start_position).is_some() {
                        warn!(row = row.row, table = %row.table_id, seq = row.sequence_number, "duplicate table header replaces earlier one");
                        if table.sequence_number() == row.sequence_number {
                            table.table = def;
                        }
                    } else {
                        debug!(row = row.row, table = %row.table_id, seq = row.sequence_number, start_position, "table continues in another sequence");
                    }
                }
            }
        }
    }

    // 2) attach universes and columns
    for row in rows {
        match row.kind {
            LineKind::Table { .. } => {}
            LineKind::Heading => {
                trace!(row = row.row, table = %row.table_id, "skipping heading line");
            }
            LineKind::Universe => match tables.get_mut(&row.table_id.to_lowercase()) {
                Some(table) => table.universe = Some(universe_text(&row.title)),
                None => warn!(row = row.row, table = %row.table_id, "universe line without table"),
            },
            LineKind::Column(line) => {
                let table = tables.get_mut(&row.table_id.to_lowercase()).ok_or_else(|| {
                    Error::MissingParent {
                        table: row.table_id.clone(),
                        line,
                    }
                })?;
                let start_position = table.segment_start(row.sequence_number).ok_or_else(|| {
                    Error::MalformedLookup {
                        row: row.row,
                        reason: format!(
                            "line {} of table {} is in sequence {}, which has no header for that table",
                            line, row.table_id, row.sequence_number
                        ),
                    }
                })?;
                let child = ColumnDefinition {
                    table_id: column_id(table.id(), line),
                    sequence_number: row.sequence_number,
                    line_number: Some(line),
                    start_position: Some(start_position),
                    cell_count: None,
                    title: title_case(&row.title),
                    subject: row.subject,
                };
                if table.add_child(child).is_some() {
                    warn!(row = row.row, table = %row.table_id, line, "duplicate line replaces earlier one");
                }
            }
        }
    }

    for table in tables.values() {
        if table.table.cell_count.is_some() && !table.is_complete() {
            warn!(
                table = %table.id(),
                declared = ?table.table.cell_count,
                found = table.len(),
                "column count differs from declared cell count"
            );
        }
    }

    Ok(tables)
}

/// `"Universe:  Housing units"` → `"Housing units"`.
fn universe_text(title: &str) -> String {
    let t = title.trim();
    match t.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("universe:") => t[9..].trim().to_string(),
        _ => t.to_string(),
    }
}
