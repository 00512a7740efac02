pub mod gateway;
pub mod value;

pub use gateway::{quote_ident, Database, QueryOutcome, ResultSet, WriteMode};
pub use value::{Row, SqlValue};
