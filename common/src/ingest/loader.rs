use crate::db::{Row, SqlValue};
use crate::error::{CsvSqlError, Result};
use crate::schema::{infer_column_types, Column, Table};
use std::collections::HashSet;
use std::path::Path;

/// a parsed csv file: inferred table definition plus typed rows
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCsv {
    pub table: Table,
    pub rows: Vec<Row>,
}

/// table name derived from the file stem
pub fn default_table_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data");

    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        name.push_str("data");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

fn validate_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(CsvSqlError::MalformedInput(
            "csv file is empty (no header row)".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (idx, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(CsvSqlError::MalformedInput(format!(
                "header column {} is blank",
                idx + 1
            )));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(CsvSqlError::MalformedInput(format!(
                "duplicate header column '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// read a csv file with a header row and infer a typed table from it
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_csv(path: &Path, table_name: &str) -> Result<LoadedCsv> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|e| {
            CsvSqlError::MalformedInput(format!("cannot read {}: {}", path.display(), e))
        })?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    // a lone empty header line parses as one blank field
    if headers.len() == 1 && headers[0].is_empty() {
        return Err(CsvSqlError::MalformedInput(
            "csv file is empty (no header row)".to_string(),
        ));
    }
    validate_headers(&headers)?;

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(|f| f.to_string()).collect());
    }

    tracing::info!(
        columns = headers.len(),
        rows = records.len(),
        "parsed csv"
    );

    let types = infer_column_types(headers.len(), &records);
    let columns: Vec<Column> = headers
        .into_iter()
        .zip(types.iter().copied())
        .map(|(name, column_type)| Column::new(name, column_type))
        .collect();

    let rows: Vec<Row> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&types)
                .map(|(field, column_type)| SqlValue::from_field(field, *column_type))
                .collect()
        })
        .collect();

    let table = Table::new(table_name, columns);
    tracing::debug!(schema = %table.signature(), "inferred schema");

    Ok(LoadedCsv { table, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_infers_types() {
        let file = csv_file("a,b\n1,2\n3,x\n");
        let loaded = load_csv(file.path(), "t").unwrap();

        assert_eq!(
            loaded.table.columns,
            vec![
                Column::new("a", ColumnType::Integer),
                Column::new("b", ColumnType::Text),
            ]
        );
        assert_eq!(
            loaded.rows,
            vec![
                vec![SqlValue::Integer(1), SqlValue::Text("2".into())],
                vec![SqlValue::Integer(3), SqlValue::Text("x".into())],
            ]
        );
    }

    #[test]
    fn test_inference_is_stable() {
        let file = csv_file("price,label\n1.5,a\n2,b\n,c\n");
        let first = load_csv(file.path(), "t").unwrap();
        let second = load_csv(file.path(), "t").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.table.columns[0].column_type, ColumnType::Real);
        assert_eq!(first.rows[2][0], SqlValue::Null);
    }

    #[test]
    fn test_headers_are_trimmed() {
        let file = csv_file(" id , name \n1,ada\n");
        let loaded = load_csv(file.path(), "t").unwrap();
        assert_eq!(loaded.table.columns[0].name, "id");
        assert_eq!(loaded.table.columns[1].name, "name");
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let file = csv_file("id,name\n");
        let loaded = load_csv(file.path(), "t").unwrap();
        assert!(loaded.rows.is_empty());
        assert_eq!(loaded.table.columns[0].column_type, ColumnType::Text);
    }

    #[test]
    fn test_empty_file_fails() {
        let file = csv_file("");
        let err = load_csv(file.path(), "t").unwrap_err();
        assert!(matches!(err, CsvSqlError::MalformedInput(_)));
    }

    #[test]
    fn test_ragged_rows_fail() {
        let file = csv_file("a,b\n1,2\n3\n");
        let err = load_csv(file.path(), "t").unwrap_err();
        assert!(matches!(err, CsvSqlError::MalformedInput(_)));
    }

    #[test]
    fn test_duplicate_headers_fail() {
        let file = csv_file("id,ID\n1,2\n");
        let err = load_csv(file.path(), "t").unwrap_err();
        assert!(matches!(err, CsvSqlError::MalformedInput(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_duplicate_check_folds_ascii_only() {
        // sqlite treats these as distinct identifiers
        let file = csv_file("\u{c9}tat,\u{e9}tat\n1,2\n");
        let loaded = load_csv(file.path(), "t").unwrap();
        assert_eq!(loaded.table.columns.len(), 2);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_csv(Path::new("/definitely/not/here.csv"), "t").unwrap_err();
        assert!(matches!(err, CsvSqlError::MalformedInput(_)));
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name(Path::new("data/people.csv")), "people");
        assert_eq!(default_table_name(Path::new("sales-2024 q1.csv")), "sales_2024_q1");
        assert_eq!(default_table_name(Path::new("2024.csv")), "_2024");
    }
}
