// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::TableDefinition;

pub const LOGRECNO_FIELD: &str = "logrecno";
pub const GEOID_FIELD: &str = "geoid";

/// Arrow schema for decoded rows of `table`:
/// - `logrecno`  → Utf8, required
/// - `geoid`     → Utf8, nullable
/// - one nullable Int64 per column, in line order
pub fn build_arrow_schema(table: &TableDefinition) -> Arc<ArrowSchema> {
    let mut fields = Vec::with_capacity(table.len() + 2);
    fields.push(ArrowField::new(LOGRECNO_FIELD, DataType::Utf8, false));
    fields.push(ArrowField::new(GEOID_FIELD, DataType::Utf8, true));
    for col in table.children() {
        fields.push(ArrowField::new(&col.table_id, DataType::Int64, true));
    }
    Arc::new(ArrowSchema::new(fields))
}
