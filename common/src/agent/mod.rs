pub mod parser;
pub mod prompt;
pub mod translator;

pub use parser::extract_sql;
pub use prompt::{build_sql_prompt, SQL_SYSTEM_PROMPT};
pub use translator::{OpenAiTranslator, SqlTranslator};
