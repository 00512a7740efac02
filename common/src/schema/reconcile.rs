use crate::schema::inference::{Column, Table};
use serde::Serialize;
use std::fmt;

/// outcome of comparing an incoming table with what the database already holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CreateNew,
    AppendCompatible,
    ConflictDetected(SchemaConflict),
}

/// one position where incoming and existing columns disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDiff {
    pub position: usize,
    pub existing: Option<Column>,
    pub incoming: Option<Column>,
}

impl fmt::Display for ColumnDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |c: &Option<Column>| match c {
            Some(c) => format!("{} {}", c.name, c.column_type),
            None => "<none>".to_string(),
        };
        write!(
            f,
            "column {}: existing {} / incoming {}",
            self.position + 1,
            describe(&self.existing),
            describe(&self.incoming)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaConflict {
    pub existing: Table,
    pub incoming: Table,
    pub diffs: Vec<ColumnDiff>,
}

impl fmt::Display for SchemaConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  existing: {}", self.existing.signature())?;
        writeln!(f, "  incoming: {}", self.incoming.signature())?;
        let lines: Vec<String> = self.diffs.iter().map(|d| format!("  {}", d)).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// how the caller wants a detected conflict handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResolution {
    Abort,
    Rename(String),
    Overwrite,
}

fn same_column(a: &Column, b: &Column) -> bool {
    // sqlite identifiers are case-insensitive
    a.name.eq_ignore_ascii_case(&b.name) && a.column_type == b.column_type
}

/// order-sensitive comparison of incoming columns against an existing table
pub fn reconcile(incoming: &Table, existing: Option<&Table>) -> Decision {
    let existing = match existing {
        None => return Decision::CreateNew,
        Some(t) => t,
    };

    let width = incoming.columns.len().max(existing.columns.len());
    let diffs: Vec<ColumnDiff> = (0..width)
        .filter_map(|position| {
            let lhs = existing.columns.get(position);
            let rhs = incoming.columns.get(position);
            match (lhs, rhs) {
                (Some(l), Some(r)) if same_column(l, r) => None,
                _ => Some(ColumnDiff {
                    position,
                    existing: lhs.cloned(),
                    incoming: rhs.cloned(),
                }),
            }
        })
        .collect();

    if diffs.is_empty() {
        Decision::AppendCompatible
    } else {
        Decision::ConflictDetected(SchemaConflict {
            existing: existing.clone(),
            incoming: incoming.clone(),
            diffs,
        })
    }
}
