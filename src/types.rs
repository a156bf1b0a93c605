use crate::error::{EtlError, Result, RowDefect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell text captured from a parsed document, rows × columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A typed cell value. `Missing` is never equal to any number, zero included.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&crate::pipeline::normalize::render_number(*n)),
            Value::Missing => Ok(()),
        }
    }
}

/// Declared type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
}

/// Ordered field names shared by every record of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for field in fields {
            schema.push(field.into())?;
        }
        Ok(schema)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    fn push(&mut self, field: String) -> Result<()> {
        if self.index_of(&field).is_some() {
            return Err(EtlError::Schema(format!("duplicate field '{}'", field)));
        }
        self.fields.push(field);
        Ok(())
    }
}

/// Values of one row, positionally aligned with the owning `RecordSet`'s schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Records in source row order, all sharing one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.values.len() != self.schema.len() {
            return Err(EtlError::Schema(format!(
                "record has {} values but schema has {} fields",
                record.values.len(),
                self.schema.len()
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Value of `field` in the record at `row`.
    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        let idx = self.schema.index_of(field)?;
        self.records.get(row).and_then(|r| r.values.get(idx))
    }

    /// All values of `field`, in record order.
    pub fn column(&self, field: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(field)?;
        Some(self.records.iter().map(|r| &r.values[idx]).collect())
    }

    /// Appends a field, computing its value for each record from the record's existing values.
    pub fn append_field<F>(mut self, field: &str, mut compute: F) -> Result<Self>
    where
        F: FnMut(&Record) -> Value,
    {
        self.schema.push(field.to_string())?;
        for record in &mut self.records {
            let value = compute(record);
            record.values.push(value);
        }
        Ok(self)
    }
}

/// A row that did not make it into the record set, with its source row index.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    pub row: usize,
    pub defect: RowDefect,
}

/// Accepted records plus the reasons every other row was dropped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: RecordSet,
    pub dropped: Vec<DroppedRow>,
}

impl Extraction {
    /// Rows dropped because a cell could not be coerced, as opposed to rule rejections.
    pub fn coercion_failures(&self) -> impl Iterator<Item = &DroppedRow> {
        self.dropped
            .iter()
            .filter(|d| !matches!(d.defect, RowDefect::Rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_field_set() -> RecordSet {
        let mut set = RecordSet::new(Schema::new(["Name", "Amount"]).unwrap());
        set.push(Record::new(vec![Value::Text("A".into()), Value::Number(1.5)]))
            .unwrap();
        set.push(Record::new(vec![Value::Text("B".into()), Value::Missing]))
            .unwrap();
        set
    }

    #[test]
    fn test_missing_is_not_zero() {
        assert_ne!(Value::Missing, Value::Number(0.0));
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        assert!(Schema::new(["Name", "Name"]).is_err());
    }

    #[test]
    fn test_push_rejects_wrong_width() {
        let mut set = RecordSet::new(Schema::new(["Name", "Amount"]).unwrap());
        let result = set.push(Record::new(vec![Value::Text("A".into())]));
        assert!(matches!(result, Err(EtlError::Schema(_))));
        assert!(set.is_empty());
    }

    #[test]
    fn test_value_lookup_by_field() {
        let set = two_field_set();
        assert_eq!(set.value(0, "Amount"), Some(&Value::Number(1.5)));
        assert_eq!(set.value(1, "Amount"), Some(&Value::Missing));
        assert_eq!(set.value(0, "Nope"), None);
        assert_eq!(set.value(5, "Name"), None);
    }

    #[test]
    fn test_append_field_keeps_every_record_aligned() {
        let set = two_field_set()
            .append_field("Doubled", |r| match r.values()[1] {
                Value::Number(n) => Value::Number(n * 2.0),
                _ => Value::Missing,
            })
            .unwrap();

        assert_eq!(set.schema().fields(), &["Name", "Amount", "Doubled"]);
        assert!(set.records().iter().all(|r| r.values().len() == 3));
        assert_eq!(set.value(0, "Doubled"), Some(&Value::Number(3.0)));
        assert_eq!(set.value(1, "Doubled"), Some(&Value::Missing));
    }

    #[test]
    fn test_display_renders_missing_as_empty() {
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Text("x".into()).to_string(), "x");
    }
}
