pub mod inference;
pub mod reconcile;

pub use inference::{infer_column_types, Column, ColumnType, Table, TypeTally};
pub use reconcile::{reconcile, ColumnDiff, ConflictResolution, Decision, SchemaConflict};
