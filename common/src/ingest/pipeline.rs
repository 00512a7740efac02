use crate::db::{Database, WriteMode};
use crate::error::{CsvSqlError, Result};
use crate::ingest::loader::LoadedCsv;
use crate::schema::{reconcile, ConflictResolution, Decision, SchemaConflict};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    Created,
    Appended,
    Replaced,
}

impl fmt::Display for LoadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadAction::Created => "created",
            LoadAction::Appended => "appended to",
            LoadAction::Replaced => "replaced",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// final table name, after any rename
    pub table: String,
    pub action: LoadAction,
    pub rows: usize,
}

/// reconcile a parsed csv against the database and write it.
///
/// `resolve` is consulted once per detected conflict and nothing is written
/// until it returns something other than `Abort`. A rename is reconciled
/// again under the new name.
#[tracing::instrument(skip(db, loaded, resolve), fields(table = %loaded.table.name, rows = loaded.rows.len()))]
pub fn load_into<F>(db: &mut Database, loaded: LoadedCsv, mut resolve: F) -> Result<LoadReport>
where
    F: FnMut(&SchemaConflict) -> Result<ConflictResolution>,
{
    let LoadedCsv { mut table, rows } = loaded;

    loop {
        if table.name.trim().is_empty() {
            return Err(CsvSqlError::MalformedInput(
                "table name must not be empty".to_string(),
            ));
        }

        let existing = db.table_schema(&table.name)?;
        let (mode, action) = match reconcile(&table, existing.as_ref()) {
            Decision::CreateNew => (WriteMode::Create, LoadAction::Created),
            Decision::AppendCompatible => (WriteMode::Append, LoadAction::Appended),
            Decision::ConflictDetected(conflict) => {
                tracing::warn!(diffs = conflict.diffs.len(), "schema conflict detected");

                match resolve(&conflict)? {
                    ConflictResolution::Abort => {
                        return Err(CsvSqlError::SchemaConflict {
                            table: table.name.clone(),
                            conflict,
                        });
                    }
                    ConflictResolution::Rename(new_name) => {
                        if new_name.eq_ignore_ascii_case(&table.name) {
                            return Err(CsvSqlError::MalformedInput(format!(
                                "rename target '{}' is the conflicting table",
                                new_name
                            )));
                        }
                        tracing::info!(from = %table.name, to = %new_name, "retrying under new name");
                        table = table.renamed(new_name);
                        continue;
                    }
                    ConflictResolution::Overwrite => (WriteMode::Replace, LoadAction::Replaced),
                }
            }
        };

        let inserted = db.write_table(&table, &rows, mode)?;
        tracing::info!(table = %table.name, %action, inserted, "load complete");

        return Ok(LoadReport {
            table: table.name,
            action,
            rows: inserted,
        });
    }
}
