use crate::error::{EtlError, Result};
use crate::pipeline::extract::ColumnSpec;
use crate::types::{FieldKind, RecordSet, Value};
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Writes the header and one line per record, in record order.
#[instrument(skip(records), fields(records = records.len()))]
pub fn write_csv(records: &RecordSet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(records.schema().fields())?;
    for record in records.records() {
        writer.write_record(record.values().iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Opens (or creates) the SQLite database; `:memory:` gives a private in-memory one.
pub fn open_database(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    debug!("Opened database {}", path);
    Ok(conn)
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite column type for each field.
///
/// TEXT if any record holds text, REAL if any holds a number. A field with no
/// values at all takes its declared kind from `declared`, and is REAL when it
/// is not declared there (derived columns).
pub fn infer_column_types(records: &RecordSet, declared: &[ColumnSpec]) -> Vec<&'static str> {
    records
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let column = || records.records().iter().map(move |r| &r.values()[idx]);
            let kind = if column().any(|v| matches!(v, Value::Text(_))) {
                FieldKind::Text
            } else if column().any(|v| !v.is_missing()) {
                FieldKind::Number
            } else {
                declared
                    .iter()
                    .find(|c| &c.name == field)
                    .map_or(FieldKind::Number, |c| c.kind)
            };
            match kind {
                FieldKind::Text => "TEXT",
                FieldKind::Number => "REAL",
            }
        })
        .collect()
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Number(n) => SqlValue::Real(*n),
        Value::Missing => SqlValue::Null,
    }
}

/// Replaces `table` with the contents of `records` in one transaction.
///
/// Any previous table of that name is dropped first, so writing the same
/// record set twice leaves exactly one copy.
pub fn write_table(records: &RecordSet, conn: &mut Connection, table: &str) -> Result<usize> {
    write_table_with_columns(records, conn, table, &[])
}

/// Like `write_table`, typing columns without values from their declared kind.
#[instrument(skip(records, conn, declared), fields(records = records.len()))]
pub fn write_table_with_columns(
    records: &RecordSet,
    conn: &mut Connection,
    table: &str,
    declared: &[ColumnSpec],
) -> Result<usize> {
    if table.trim().is_empty() {
        return Err(EtlError::Config("table name must not be empty".into()));
    }
    if records.schema().is_empty() {
        return Err(EtlError::Schema("cannot create a table without fields".into()));
    }

    let table_ident = quote_ident(table);
    let column_defs: Vec<String> = records
        .schema()
        .fields()
        .iter()
        .zip(infer_column_types(records, declared))
        .map(|(field, ty)| format!("{} {}", quote_ident(field), ty))
        .collect();
    let placeholders: Vec<String> = (1..=records.schema().len()).map(|i| format!("?{}", i)).collect();

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};\nCREATE TABLE {table} ({columns});",
        table = table_ident,
        columns = column_defs.join(", ")
    ))?;

    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            table_ident,
            placeholders.join(", ")
        ))?;
        for record in records.records() {
            stmt.execute(params_from_iter(record.values().iter().map(to_sql)))?;
        }
    }
    tx.commit()?;

    info!("Loaded {} rows into {}", records.len(), table);
    Ok(records.len())
}
