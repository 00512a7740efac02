use serde::{Deserialize, Serialize};
use std::fmt;

/// primitive column type inferred from csv values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// sqlite declared type used in create table
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// map a declared sqlite type back to a column type using sqlite's affinity rules
    pub fn from_declared(declared: &str) -> ColumnType {
        let upper = declared.to_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// same columns under a different table name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
        }
    }

    /// compact `name(col TYPE, ...)` form used in prompts and listings
    pub fn signature(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type))
            .collect();
        format!("{}({})", self.name, cols.join(", "))
    }
}

fn classify(value: &str) -> ColumnType {
    if value.parse::<i64>().is_ok() {
        ColumnType::Integer
    } else if value.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false) {
        ColumnType::Real
    } else {
        ColumnType::Text
    }
}

/// running per-column vote over observed values
#[derive(Debug, Clone, Default)]
pub struct TypeTally {
    integer: usize,
    real: usize,
    text: usize,
}

impl TypeTally {
    pub fn observe(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match classify(value) {
            ColumnType::Integer => self.integer += 1,
            ColumnType::Real => self.real += 1,
            ColumnType::Text => self.text += 1,
        }
    }

    /// numeric wins only on a strict majority; ties and empty columns fall back to text
    pub fn resolve(&self) -> ColumnType {
        let numeric = self.integer + self.real;
        if numeric > self.text {
            if self.real > 0 {
                ColumnType::Real
            } else {
                ColumnType::Integer
            }
        } else {
            ColumnType::Text
        }
    }
}

/// infer one type per column from row-major string records
pub fn infer_column_types<R, F>(column_count: usize, records: R) -> Vec<ColumnType>
where
    R: IntoIterator<Item = F>,
    F: AsRef<[String]>,
{
    let mut tallies = vec![TypeTally::default(); column_count];

    for record in records {
        for (tally, value) in tallies.iter_mut().zip(record.as_ref()) {
            tally.observe(value);
        }
    }

    tallies.iter().map(TypeTally::resolve).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_mixed_column_falls_back_to_text() {
        let records = rows(&[&["1", "2"], &["3", "x"]]);
        let types = infer_column_types(2, &records);
        assert_eq!(types, vec![ColumnType::Integer, ColumnType::Text]);
    }

    #[test]
    fn test_integer_and_real_promote_to_real() {
        let records = rows(&[&["1"], &["2.5"], &["3"]]);
        assert_eq!(infer_column_types(1, &records), vec![ColumnType::Real]);
    }

    #[test]
    fn test_majority_numeric_wins() {
        let records = rows(&[&["1"], &["2"], &["n/a"]]);
        assert_eq!(infer_column_types(1, &records), vec![ColumnType::Integer]);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let records = rows(&[&[""], &["7"], &[" "]]);
        assert_eq!(infer_column_types(1, &records), vec![ColumnType::Integer]);
    }

    #[test]
    fn test_no_values_is_text() {
        let records: Vec<Vec<String>> = Vec::new();
        assert_eq!(infer_column_types(2, &records), vec![ColumnType::Text; 2]);
    }

    #[test]
    fn test_non_finite_is_text() {
        let records = rows(&[&["inf"], &["NaN"]]);
        assert_eq!(infer_column_types(1, &records), vec![ColumnType::Text]);
    }

    #[test]
    fn test_from_declared_affinity() {
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("varchar(20)"), ColumnType::Text);
        assert_eq!(ColumnType::from_declared("DOUBLE"), ColumnType::Real);
        assert_eq!(ColumnType::from_declared(""), ColumnType::Text);
    }

    #[test]
    fn test_table_signature() {
        let table = Table::new(
            "people",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("name", ColumnType::Text),
            ],
        );
        assert_eq!(table.signature(), "people(id INTEGER, name TEXT)");
    }
}
