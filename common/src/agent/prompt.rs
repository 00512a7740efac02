use crate::schema::Table;

pub const SQL_SYSTEM_PROMPT: &str =
    "you translate requests into sqlite sql. \
     output only a single valid sqlite statement. \
     no markdown, no commentary, no explanations.";

pub fn build_sql_prompt(schema: &[Table], request: &str) -> String {
    let schema_text = if schema.is_empty() {
        "the database has no tables".to_string()
    } else {
        schema
            .iter()
            .map(|t| format!("- {}", t.signature()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "database schema:\n{}\n\nuser request: {}",
        schema_text,
        request.trim()
    )
}
