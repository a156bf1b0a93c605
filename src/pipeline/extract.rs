use crate::error::{Result, RowDefect};
use crate::pipeline::normalize::{is_sentinel, parse_numeric};
use crate::types::{DroppedRow, Extraction, FieldKind, RawTable, Record, RecordSet, Schema, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// One declared output field and the table column it is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub cell: usize,
    pub kind: FieldKind,
}

impl ColumnSpec {
    pub fn text(name: &str, cell: usize) -> Self {
        Self {
            name: name.to_string(),
            cell,
            kind: FieldKind::Text,
        }
    }

    pub fn number(name: &str, cell: usize) -> Self {
        Self {
            name: name.to_string(),
            cell,
            kind: FieldKind::Number,
        }
    }
}

/// Row acceptance rules; a row is accepted when every configured rule holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RowRule {
    /// At least `count` cells.
    MinCells { count: usize },
    /// Cell `cell` exists and has non-blank text.
    NonEmpty { cell: usize },
    /// Cell `cell` does not contain the sentinel token.
    NotSentinel { cell: usize },
}

impl RowRule {
    pub fn accepts(&self, cells: &[String]) -> bool {
        match self {
            RowRule::MinCells { count } => cells.len() >= *count,
            RowRule::NonEmpty { cell } => cells.get(*cell).is_some_and(|c| !c.trim().is_empty()),
            RowRule::NotSentinel { cell } => cells
                .get(*cell)
                .map_or(true, |c| !c.contains(crate::constants::SENTINEL)),
        }
    }
}

/// Builds a predicate that holds when all `rules` accept the row.
pub fn all_rules(rules: &[RowRule]) -> impl Fn(&[String]) -> bool + '_ {
    move |cells: &[String]| rules.iter().all(|rule| rule.accepts(cells))
}

/// Schema made of the declared column names, in declaration order.
pub fn schema_for(columns: &[ColumnSpec]) -> Result<Schema> {
    Schema::new(columns.iter().map(|c| c.name.clone()))
}

/// Coerces one row into a record following `columns`.
pub fn extract_row(cells: &[String], columns: &[ColumnSpec]) -> std::result::Result<Record, RowDefect> {
    let mut values = Vec::with_capacity(columns.len());

    for column in columns {
        let text = cells.get(column.cell).ok_or_else(|| RowDefect::MissingCell {
            field: column.name.clone(),
            column: column.cell,
        })?;

        let value = match column.kind {
            FieldKind::Text => Value::Text(text.trim().to_string()),
            FieldKind::Number => match parse_numeric(text) {
                Value::Missing if !is_sentinel(text) => {
                    return Err(RowDefect::Unparsable {
                        field: column.name.clone(),
                        text: text.clone(),
                    });
                }
                value => value,
            },
        };
        values.push(value);
    }

    Ok(Record::new(values))
}

/// Turns a raw table into typed records.
///
/// Rows failing `accept` are skipped; rows whose cells cannot be coerced are
/// dropped and logged. Neither is an error, so the record count never exceeds
/// the row count and may be zero. A sentinel in a numeric cell is kept as
/// `Value::Missing`.
#[instrument(skip_all, fields(rows = raw.num_rows()))]
pub fn extract<F>(raw: &RawTable, columns: &[ColumnSpec], accept: F) -> Result<Extraction>
where
    F: Fn(&[String]) -> bool,
{
    let mut records = RecordSet::new(schema_for(columns)?);
    let mut dropped = Vec::new();

    for (row, cells) in raw.rows().iter().enumerate() {
        if !accept(cells.as_slice()) {
            debug!("Row {} rejected by acceptance rules", row);
            dropped.push(DroppedRow {
                row,
                defect: RowDefect::Rejected,
            });
            continue;
        }

        match extract_row(cells, columns) {
            Ok(record) => records.push(record)?,
            Err(defect) => {
                warn!("Dropping row {}: {}", row, defect);
                dropped.push(DroppedRow { row, defect });
            }
        }
    }

    info!(
        "Extracted {} records from {} rows ({} dropped)",
        records.len(),
        raw.num_rows(),
        dropped.len()
    );

    Ok(Extraction { records, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn bank_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::text("Name", 1),
            ColumnSpec::number("MC_USD_Billion", 2),
        ]
    }

    fn bank_rules() -> Vec<RowRule> {
        vec![RowRule::MinCells { count: 3 }, RowRule::NonEmpty { cell: 1 }]
    }

    #[test]
    fn test_rules_combine_with_and() {
        let rules = bank_rules();
        let accept = all_rules(&rules);
        assert!(accept(row(&["1", "JPMorgan Chase", "432.92"]).as_slice()));
        assert!(!accept(row(&["1", "  ", "432.92"]).as_slice()));
        assert!(!accept(row(&["1", "JPMorgan Chase"]).as_slice()));
    }

    #[test]
    fn test_not_sentinel_rule() {
        let rule = RowRule::NotSentinel { cell: 2 };
        assert!(!rule.accepts(&row(&["x", "y", "—"])));
        assert!(rule.accepts(&row(&["x", "y", "1,000"])));
    }

    #[test]
    fn test_header_and_short_rows_are_rejected_not_errors() {
        let raw = RawTable::new(vec![
            row(&[]),
            row(&["1", "JPMorgan Chase", "432.92"]),
            row(&["2"]),
        ]);
        let rules = bank_rules();
        let result = extract(&raw, &bank_columns(), all_rules(&rules)).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.dropped.len(), 2);
        assert!(result.dropped.iter().all(|d| d.defect == RowDefect::Rejected));
        assert_eq!(result.coercion_failures().count(), 0);
    }

    #[test]
    fn test_unparsable_number_drops_row_with_reason() {
        let raw = RawTable::new(vec![
            row(&["1", "Good Bank", "1,234.5"]),
            row(&["2", "Odd Bank", "about ten"]),
        ]);
        let rules = bank_rules();
        let result = extract(&raw, &bank_columns(), all_rules(&rules)).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records.value(0, "MC_USD_Billion"), Some(&Value::Number(1234.5)));
        assert_eq!(
            result.dropped,
            vec![DroppedRow {
                row: 1,
                defect: RowDefect::Unparsable {
                    field: "MC_USD_Billion".into(),
                    text: "about ten".into(),
                },
            }]
        );
    }

    #[test]
    fn test_sentinel_number_is_kept_as_missing() {
        let raw = RawTable::new(vec![row(&["1", "Quiet Bank", "—"])]);
        let rules = bank_rules();
        let result = extract(&raw, &bank_columns(), all_rules(&rules)).unwrap();
        assert_eq!(result.records.value(0, "MC_USD_Billion"), Some(&Value::Missing));
    }

    #[test]
    fn test_footnoted_sentinel_keeps_the_row() {
        let raw = RawTable::new(vec![row(&["1", "Bank", "—[1]"]), row(&["2", "Other", "5[a]"])]);
        let rules = bank_rules();
        let result = extract(&raw, &bank_columns(), all_rules(&rules)).unwrap();

        assert!(result.dropped.is_empty());
        assert_eq!(result.records.value(0, "MC_USD_Billion"), Some(&Value::Missing));
        assert_eq!(result.records.value(1, "MC_USD_Billion"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_missing_cell_is_reported() {
        let columns = vec![ColumnSpec::text("Name", 0), ColumnSpec::number("Value", 4)];
        let raw = RawTable::new(vec![row(&["a", "b"])]);
        let result = extract(&raw, &columns, |_: &[String]| true).unwrap();
        assert_eq!(
            result.dropped[0].defect,
            RowDefect::MissingCell {
                field: "Value".into(),
                column: 4,
            }
        );
    }

    #[test]
    fn test_record_count_never_exceeds_row_count() {
        let tables = vec![
            RawTable::default(),
            RawTable::new(vec![row(&["1", "A", "1"]); 4]),
            RawTable::new(vec![row(&["1", "", "x"]), row(&["2", "B", "—"]), row(&["3"])]),
        ];
        let rules = bank_rules();
        for raw in &tables {
            let result = extract(raw, &bank_columns(), all_rules(&rules)).unwrap();
            assert!(result.records.len() <= raw.num_rows());
            assert_eq!(result.records.len() + result.dropped.len(), raw.num_rows());
        }
    }

    #[test]
    fn test_duplicate_column_names_are_a_schema_error() {
        let columns = vec![ColumnSpec::text("Name", 0), ColumnSpec::text("Name", 1)];
        assert!(extract(&RawTable::default(), &columns, |_: &[String]| true).is_err());
    }
}
