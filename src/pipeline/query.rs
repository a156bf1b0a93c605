use crate::error::Result;
use crate::pipeline::normalize::render_number;
use rusqlite::{types::Value as SqlValue, Connection};
use std::fmt;
use tracing::instrument;

/// Column names and rows returned by one query, as the engine produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryOutput {
    /// First column of the first row, for single-value queries such as aggregates.
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

fn render(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => render_number(*f),
        SqlValue::Text(s) => format!("'{}'", s),
        SqlValue::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Executing -> {}", self.query)?;
        writeln!(f, "({})", self.columns.join(", "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render).collect();
            writeln!(f, "({})", cells.join(", "))?;
        }
        Ok(())
    }
}

/// Runs `query` as-is. Errors from the engine, malformed SQL included, are returned untouched.
#[instrument(skip(conn))]
pub fn run_query(query: &str, conn: &Connection) -> Result<QueryOutput> {
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let values = (0..width)
            .map(|i| row.get::<_, SqlValue>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(QueryOutput {
        query: query.to_string(),
        columns,
        rows,
    })
}
