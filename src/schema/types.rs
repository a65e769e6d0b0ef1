// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// One entry of the sequence/table lookup file: either a whole table
/// (`start_position` set, no `line_number`) or one of its data columns
/// (`line_number` set, position inherited from the table).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct ColumnDefinition {
    /// Table id for a table (`B25034`), column id for a child (`B25034_001`).
    pub table_id: String,
    pub sequence_number: u32,
    pub line_number: Option<u32>,
    pub start_position: Option<u32>,
    pub cell_count: Option<u32>,
    pub title: String,
    pub subject: String,
}

impl ColumnDefinition {
    pub fn is_table(&self) -> bool {
        self.line_number.is_none()
    }

    /// Zero-based row index of this column's cell, for child columns.
    pub fn field_offset(&self) -> Option<usize> {
        match (self.start_position, self.line_number) {
            (Some(start), Some(line)) => Some(field_offset(start, line)),
            _ => None,
        }
    }
}

/// Zero-based index into a sequence-file row of the cell for `line_number`
/// of a table starting at `start_position`.
///
/// Both inputs are one-based: line 1 sits at the start position itself, so
/// the index is `start_position + line_number - 2`.
pub fn field_offset(start_position: u32, line_number: u32) -> usize {
    (start_position as usize + line_number as usize).saturating_sub(2)
}

/// Column id for `line` of `table`, e.g. `B25034_001`.
pub fn column_id(table: &str, line: u32) -> String {
    format!("{}_{:03}", table, line)
}

/// Inclusive run of column ids, `start..=end` (just `start` when `end` is
/// `None`).
pub fn column_range(table: &str, start: u32, end: Option<u32>) -> Vec<String> {
    (start..=end.unwrap_or(start))
        .map(|line| column_id(table, line))
        .collect()
}

/// A table and its data columns, iterated in line-number order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TableDefinition {
    pub table: ColumnDefinition,
    /// Population the estimates describe ("Housing units"), when the
    /// lookup file carries a universe line for the table.
    pub universe: Option<String>,
    /// Sequence number → start position. Wide tables continue across
    /// several sequence files, one segment each.
    segments: BTreeMap<u32, u32>,
    children: BTreeMap<u32, ColumnDefinition>,
}

impl TableDefinition {
    pub(crate) fn new(table: ColumnDefinition, start_position: u32) -> Self {
        let mut segments = BTreeMap::new();
        segments.insert(table.sequence_number, start_position);
        Self {
            table,
            universe: None,
            segments,
            children: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.table.table_id
    }

    pub fn title(&self) -> &str {
        &self.table.title
    }

    pub fn subject(&self) -> &str {
        &self.table.subject
    }

    /// Sequence number of the first header row seen for this table.
    pub fn sequence_number(&self) -> u32 {
        self.table.sequence_number
    }

    /// Start position within [`Self::sequence_number`]'s file.
    pub fn start_position(&self) -> u32 {
        self.segment_start(self.table.sequence_number)
            .unwrap_or_default()
    }

    /// Every sequence file holding part of this table, ascending.
    pub fn sequence_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.segments.keys().copied()
    }

    pub fn segment_start(&self, sequence_number: u32) -> Option<u32> {
        self.segments.get(&sequence_number).copied()
    }

    /// Register the part of this table held in `sequence_number`; returns
    /// the start position it replaced, if any.
    pub(crate) fn add_segment(&mut self, sequence_number: u32, start_position: u32) -> Option<u32> {
        self.segments.insert(sequence_number, start_position)
    }

    /// Data columns stored in `sequence_number`'s file, in line order.
    pub fn children_in(&self, sequence_number: u32) -> impl Iterator<Item = &ColumnDefinition> + '_ {
        self.children
            .values()
            .filter(move |c| c.sequence_number == sequence_number)
    }

    /// Attach a data column; returns the column it replaced, if any.
    pub(crate) fn add_child(&mut self, child: ColumnDefinition) -> Option<ColumnDefinition> {
        let line = child.line_number?;
        self.children.insert(line, child)
    }

    /// Data columns sorted by line number.
    pub fn children(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.children.values()
    }

    pub fn child(&self, line_number: u32) -> Option<&ColumnDefinition> {
        self.children.get(&line_number)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the number of attached columns equals the declared cell count.
    pub fn is_complete(&self) -> bool {
        self.table.cell_count == Some(self.children.len() as u32)
    }

    /// Table title followed by one tab-indented line per column title.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.table.title);
        for child in self.children() {
            let _ = writeln!(out, "\t{}", child.title);
        }
        out
    }
}
