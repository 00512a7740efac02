pub mod loader;
pub mod pipeline;

pub use loader::{default_table_name, load_csv, LoadedCsv};
pub use pipeline::{load_into, LoadAction, LoadReport};
