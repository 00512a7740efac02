use crate::config::DatabaseConfig;
use crate::db::value::{Row, SqlValue};
use crate::error::{CsvSqlError, Result};
use crate::schema::{Column, ColumnType, Table};
use rusqlite::{params_from_iter, Batch, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// rows and column names returned by a statement that yields a result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Affected(usize),
}

/// how `write_table` treats an existing table of the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Append,
    Replace,
}

/// quote an identifier for interpolation into ddl/dml
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.as_sql()))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&table.name),
        columns.join(", ")
    )
}

fn insert_sql(table_name: &str, width: usize) -> String {
    let placeholders = vec!["?"; width].join(", ");
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table_name),
        placeholders
    )
}

fn check_widths(table_name: &str, width: usize, rows: &[Row]) -> Result<()> {
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(CsvSqlError::MalformedInput(format!(
            "row {} has {} values but table '{}' has {} columns",
            idx + 1,
            row.len(),
            table_name,
            width
        )));
    }
    Ok(())
}

// works on a plain connection or inside a transaction
fn insert_all(conn: &Connection, table_name: &str, width: usize, rows: &[Row]) -> Result<usize> {
    let mut stmt = conn.prepare(&insert_sql(table_name, width))?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(inserted)
}

/// file-backed sqlite store
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// open (or create) the database file named by the config
    #[tracing::instrument(skip(config), fields(path = %config.path.display()))]
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.path)?;
        tracing::debug!("database opened");

        Ok(Self {
            conn,
            path: Some(config.path.clone()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[tracing::instrument(skip(self, table), fields(table = %table.name, columns = table.columns.len()))]
    pub fn create_table(&self, table: &Table) -> Result<()> {
        self.conn.execute(&create_table_sql(table), [])?;
        tracing::info!("created table");
        Ok(())
    }

    /// insert rows into an existing table inside a single transaction
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn insert_rows(&mut self, table_name: &str, rows: &[Row]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        // an unknown table falls through to sqlite's own "no such table" error
        let width = match self.table_schema(table_name)? {
            Some(table) => table.columns.len(),
            None => rows[0].len(),
        };
        check_widths(table_name, width, rows)?;

        let tx = self.conn.transaction()?;
        let inserted = insert_all(&tx, table_name, width, rows)?;
        tx.commit()?;

        tracing::info!(inserted, "rows inserted");
        Ok(inserted)
    }

    /// create/append/replace a table and its rows atomically
    #[tracing::instrument(skip(self, table, rows), fields(table = %table.name, rows = rows.len(), mode = ?mode))]
    pub fn write_table(&mut self, table: &Table, rows: &[Row], mode: WriteMode) -> Result<usize> {
        let width = table.columns.len();
        check_widths(&table.name, width, rows)?;

        let tx = self.conn.transaction()?;
        if mode == WriteMode::Replace {
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(&table.name)), [])?;
        }
        if mode != WriteMode::Append {
            tx.execute(&create_table_sql(table), [])?;
        }
        let inserted = insert_all(&tx, &table.name, width, rows)?;
        tx.commit()?;

        tracing::info!(inserted, "table written");
        Ok(inserted)
    }

    /// user table names, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// column list of an existing table, or None when it does not exist
    pub fn table_schema(&self, table_name: &str) -> Result<Option<Table>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table_name], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(Column::new(name, ColumnType::from_declared(&declared)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if columns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Table::new(table_name, columns)))
        }
    }

    /// every user table with its columns
    pub fn database_schema(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for name in self.list_tables()? {
            if let Some(table) = self.table_schema(&name)? {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    pub fn row_count(&self, table_name: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table_name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// run caller-supplied sql verbatim
    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    pub fn execute_raw(&self, sql: &str) -> Result<QueryOutcome> {
        // one statement per call; blank and comment-only pieces are skipped
        let mut batch = Batch::new(&self.conn, sql);
        let mut stmt = match batch.next()? {
            Some(stmt) => stmt,
            None => return Ok(QueryOutcome::Affected(0)),
        };
        if batch.next()?.is_some() {
            return Err(rusqlite::Error::MultipleStatement.into());
        }

        let column_count = stmt.column_count();

        if column_count == 0 {
            let affected = stmt.execute([])?;
            tracing::debug!(affected, "statement executed");
            return Ok(QueryOutcome::Affected(affected));
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(SqlValue::from(row.get_ref(i)?));
            }
            rows.push(values);
        }

        tracing::debug!(rows = rows.len(), "query returned rows");
        Ok(QueryOutcome::Rows(ResultSet { columns, rows }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::new(
            "people",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("name", ColumnType::Text),
            ],
        )
    }

    fn person(id: i64, name: &str) -> Row {
        vec![SqlValue::Integer(id), SqlValue::Text(name.to_string())]
    }

    #[test]
    fn test_select_one_on_fresh_database() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.execute_raw("SELECT 1").unwrap();

        match outcome {
            QueryOutcome::Rows(rs) => {
                assert_eq!(rs.rows, vec![vec![SqlValue::Integer(1)]]);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_table(&people()).unwrap();

        let err = db
            .execute_raw("INSERT INTO people VALUES (1, 'ada'); INSERT INTO people VALUES (2, 'bob');")
            .unwrap_err();
        assert!(matches!(err, CsvSqlError::QueryExecution(_)));
        assert_eq!(db.row_count("people").unwrap(), 0);

        assert!(db.execute_raw("SELECT 1; DROP TABLE people").is_err());
        assert_eq!(db.list_tables().unwrap(), vec!["people"]);
    }

    #[test]
    fn test_trailing_semicolon_and_comment_allowed() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.execute_raw("SELECT 2;  -- done\n").unwrap();
        match outcome {
            QueryOutcome::Rows(rs) => assert_eq!(rs.rows, vec![vec![SqlValue::Integer(2)]]),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sql_affects_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.execute_raw("").unwrap(), QueryOutcome::Affected(0));
        assert_eq!(db.execute_raw("-- nothing").unwrap(), QueryOutcome::Affected(0));
    }

    #[test]
    fn test_create_insert_list() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_table(&people()).unwrap();
        let inserted = db
            .insert_rows("people", &[person(1, "ada"), person(2, "linus")])
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(db.list_tables().unwrap(), vec!["people"]);
        assert_eq!(db.row_count("people").unwrap(), 2);
    }

    #[test]
    fn test_create_existing_table_fails() {
        let db = Database::open_in_memory().unwrap();
        db.create_table(&people()).unwrap();
        let err = db.create_table(&people()).unwrap_err();
        assert!(matches!(err, CsvSqlError::QueryExecution(_)));
    }

    #[test]
    fn test_table_schema_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.create_table(&people()).unwrap();

        assert_eq!(db.table_schema("people").unwrap(), Some(people()));
        assert_eq!(db.table_schema("missing").unwrap(), None);
    }

    #[test]
    fn test_insert_rejects_wrong_width() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_table(&people()).unwrap();

        let err = db
            .insert_rows("people", &[person(1, "ada"), vec![SqlValue::Integer(2)]])
            .unwrap_err();
        assert!(matches!(err, CsvSqlError::MalformedInput(_)));
        assert_eq!(db.row_count("people").unwrap(), 0);
    }

    #[test]
    fn test_insert_into_missing_table() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db.insert_rows("ghost", &[person(1, "ada")]).unwrap_err();
        assert!(matches!(err, CsvSqlError::QueryExecution(_)));
    }

    #[test]
    fn test_write_table_replace() {
        let mut db = Database::open_in_memory().unwrap();
        db.write_table(&people(), &[person(1, "ada")], WriteMode::Create)
            .unwrap();

        let replacement = Table::new("people", vec![Column::new("email", ColumnType::Text)]);
        db.write_table(
            &replacement,
            &[vec![SqlValue::Text("a@b".into())], vec![SqlValue::Null]],
            WriteMode::Replace,
        )
        .unwrap();

        assert_eq!(db.table_schema("people").unwrap(), Some(replacement));
        assert_eq!(db.row_count("people").unwrap(), 2);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut db = Database::open_in_memory().unwrap();
        db.write_table(&people(), &[person(1, "ada")], WriteMode::Create)
            .unwrap();

        // create on an existing name fails after nothing was inserted
        let err = db
            .write_table(&people(), &[person(2, "bob")], WriteMode::Create)
            .unwrap_err();
        assert!(matches!(err, CsvSqlError::QueryExecution(_)));
        assert_eq!(db.row_count("people").unwrap(), 1);
    }

    #[test]
    fn test_execute_raw_affected_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.write_table(
            &people(),
            &[person(1, "ada"), person(2, "bob")],
            WriteMode::Create,
        )
        .unwrap();

        let outcome = db.execute_raw("UPDATE people SET name = 'x'").unwrap();
        assert_eq!(outcome, QueryOutcome::Affected(2));
    }

    #[test]
    fn test_execute_raw_bad_sql() {
        let db = Database::open_in_memory().unwrap();
        let err = db.execute_raw("SELEC nonsense").unwrap_err();
        assert!(matches!(err, CsvSqlError::QueryExecution(_)));
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        let db = Database::open(&DatabaseConfig { path: path.clone() }).unwrap();

        assert_eq!(db.path(), Some(path.as_path()));
        assert!(dir.path().join("nested").is_dir());
    }
}
