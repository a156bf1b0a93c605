use crate::constants::PASS_THROUGH_RATE;
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: f64,
}

/// Currency code → multiplier, read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Reads a CSV with `Currency` and `Rate` columns; extra columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rates = HashMap::new();

        for result in reader.deserialize() {
            let row: RateRow = result?;
            if rates.insert(row.currency.clone(), row.rate).is_some() {
                warn!("Duplicate rate for {}; keeping the later value", row.currency);
            }
        }

        Ok(Self { rates })
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Multiplier for `code`, or the pass-through rate 1.0 when absent.
    pub fn get(&self, code: &str) -> f64 {
        self.lookup(code).unwrap_or(PASS_THROUGH_RATE)
    }

    pub fn lookup(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}
