pub mod arrow;
pub mod catalog;
mod lookup;
pub mod types;
pub mod write;

pub use self::arrow::build_arrow_schema;
pub use catalog::TableCatalog;
pub use types::{column_id, column_range, field_offset, ColumnDefinition, TableDefinition};
pub use write::write_catalog;
