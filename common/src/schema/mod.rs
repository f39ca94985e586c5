pub mod descriptor;
pub mod inference;

pub use descriptor::{Record, SchemaDescriptor, MAX_SAMPLE_ROWS};
pub use inference::{infer_column_types, parse_cell, ColumnType};
