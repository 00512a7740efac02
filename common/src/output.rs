use crate::db::{QueryOutcome, ResultSet};
use crate::error::Result;
use serde_json::{json, Map, Value};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

pub fn render<W: Write>(outcome: &QueryOutcome, format: OutputFormat, out: &mut W) -> Result<()> {
    match outcome {
        QueryOutcome::Affected(n) => render_affected(*n, format, out),
        QueryOutcome::Rows(rs) => match format {
            OutputFormat::Table => render_table(rs, out),
            OutputFormat::Csv => render_csv(rs, out),
            OutputFormat::Json => render_json(rs, out),
        },
    }
}

fn render_affected<W: Write>(n: usize, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", json!({ "affected": n }))?,
        _ => writeln!(out, "{} row(s) affected", n)?,
    }
    Ok(())
}

fn render_table<W: Write>(rs: &ResultSet, out: &mut W) -> Result<()> {
    let cells: Vec<Vec<String>> = rs
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = rs.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(rs.columns.as_slice()))?;
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", separator.join("-+-"))?;
    for row in &cells {
        writeln!(out, "{}", line(row.as_slice()))?;
    }

    let count = rs.rows.len();
    writeln!(out, "({} {})", count, if count == 1 { "row" } else { "rows" })?;
    Ok(())
}

fn render_csv<W: Write>(rs: &ResultSet, out: &mut W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&rs.columns)?;
    for row in &rs.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn render_json<W: Write>(rs: &ResultSet, out: &mut W) -> Result<()> {
    let mut objects = Vec::with_capacity(rs.rows.len());
    for row in &rs.rows {
        let mut object = Map::new();
        for (column, value) in rs.columns.iter().zip(row) {
            object.insert(column.clone(), serde_json::to_value(value)?);
        }
        objects.push(Value::Object(object));
    }
    serde_json::to_writer_pretty(&mut *out, &objects)?;
    writeln!(out)?;
    Ok(())
}
