use crate::error::{EtlError, Result};
use crate::pipeline::normalize::round2;
use crate::pipeline::rates::RateTable;
use crate::types::{RecordSet, Value};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Where a derived column's multiplier comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    /// Looked up in the rate table by code; absent codes pass through at 1.0.
    Rate(String),
    /// A constant, e.g. 0.001 to turn millions into billions.
    Fixed(f64),
}

/// A column computed as `round(source * multiplier, 2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    pub source: String,
    pub multiplier: Multiplier,
}

impl DerivedColumn {
    pub fn rate(name: &str, source: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            multiplier: Multiplier::Rate(code.to_string()),
        }
    }

    pub fn fixed(name: &str, source: &str, factor: f64) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            multiplier: Multiplier::Fixed(factor),
        }
    }

    fn resolve(&self, rates: &RateTable) -> f64 {
        match &self.multiplier {
            Multiplier::Fixed(factor) => *factor,
            Multiplier::Rate(code) => {
                if rates.lookup(code).is_none() {
                    warn!(
                        "No rate for '{}'; '{}' passes '{}' through unchanged",
                        code, self.name, self.source
                    );
                }
                rates.get(code)
            }
        }
    }
}

/// Appends `new_field = round(source_field * rate, 2)` to every record.
///
/// Rounding is half away from zero. Missing source values stay missing. The
/// source field itself is left untouched.
pub fn derive_column(records: RecordSet, source_field: &str, rate: f64, new_field: &str) -> Result<RecordSet> {
    let idx = records
        .schema()
        .index_of(source_field)
        .ok_or_else(|| EtlError::Schema(format!("unknown source field '{}'", source_field)))?;

    if records
        .records()
        .iter()
        .any(|r| matches!(r.values()[idx], Value::Text(_)))
    {
        return Err(EtlError::Schema(format!(
            "source field '{}' is not numeric",
            source_field
        )));
    }

    records.append_field(new_field, |record| match record.values()[idx] {
        Value::Number(n) => Value::Number(round2(n * rate)),
        _ => Value::Missing,
    })
}

/// Applies each derivation in order, each one reading only its own source field.
#[instrument(skip_all, fields(records = records.len(), derived = columns.len()))]
pub fn derive_columns(mut records: RecordSet, columns: &[DerivedColumn], rates: &RateTable) -> Result<RecordSet> {
    for column in columns {
        let rate = column.resolve(rates);
        records = derive_column(records, &column.source, rate, &column.name)?;
        info!("Derived {} from {} at x{}", column.name, column.source, rate);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, Schema};

    fn usd_set(values: &[Value]) -> RecordSet {
        let mut set = RecordSet::new(Schema::new(["Name", "MC_USD_Billion"]).unwrap());
        for (i, v) in values.iter().enumerate() {
            set.push(Record::new(vec![Value::Text(format!("Bank {}", i)), v.clone()]))
                .unwrap();
        }
        set
    }

    fn rates() -> RateTable {
        [("GBP".to_string(), 0.8), ("EUR".to_string(), 0.9)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_multiplies_and_rounds_to_two_places() {
        let set = usd_set(&[Value::Number(100.0), Value::Number(432.92)]);
        let out = derive_column(set, "MC_USD_Billion", 0.93, "MC_EUR_Billion").unwrap();
        assert_eq!(out.value(0, "MC_EUR_Billion"), Some(&Value::Number(93.0)));
        assert_eq!(out.value(1, "MC_EUR_Billion"), Some(&Value::Number(402.62)));
    }

    #[test]
    fn test_rounding_policy_is_half_away_from_zero() {
        let set = usd_set(&[Value::Number(1.125), Value::Number(-1.125)]);
        let out = derive_column(set, "MC_USD_Billion", 1.0, "Same").unwrap();
        assert_eq!(out.value(0, "Same"), Some(&Value::Number(1.13)));
        assert_eq!(out.value(1, "Same"), Some(&Value::Number(-1.13)));
    }

    #[test]
    fn test_missing_source_stays_missing() {
        let set = usd_set(&[Value::Missing]);
        let out = derive_column(set, "MC_USD_Billion", 0.8, "MC_GBP_Billion").unwrap();
        assert_eq!(out.value(0, "MC_GBP_Billion"), Some(&Value::Missing));
    }

    #[test]
    fn test_source_column_is_untouched_and_output_deterministic() {
        let set = usd_set(&[Value::Number(12.345), Value::Missing, Value::Number(7.0)]);
        let columns = vec![DerivedColumn::rate("MC_GBP_Billion", "MC_USD_Billion", "GBP")];

        let first = derive_columns(set.clone(), &columns, &rates()).unwrap();
        let second = derive_columns(set.clone(), &columns, &rates()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.column("MC_USD_Billion"), set.column("MC_USD_Billion"));
    }

    #[test]
    fn test_unknown_code_multiplies_by_exactly_one() {
        let set = usd_set(&[Value::Number(123.456)]);
        let columns = vec![DerivedColumn::rate("MC_XYZ_Billion", "MC_USD_Billion", "XYZ")];
        let out = derive_columns(set, &columns, &rates()).unwrap();
        assert_eq!(out.value(0, "MC_XYZ_Billion"), Some(&Value::Number(123.46)));
    }

    #[test]
    fn test_fixed_multiplier_scales_units() {
        let set = usd_set(&[Value::Number(26_854_599.0)]);
        let columns = vec![DerivedColumn::fixed("USD_Trillion", "MC_USD_Billion", 0.001)];
        let out = derive_columns(set, &columns, &RateTable::default()).unwrap();
        assert_eq!(out.value(0, "USD_Trillion"), Some(&Value::Number(26854.6)));
    }

    #[test]
    fn test_application_order_does_not_matter() {
        let set = usd_set(&[Value::Number(100.0), Value::Number(55.55)]);
        let gbp = DerivedColumn::rate("MC_GBP_Billion", "MC_USD_Billion", "GBP");
        let eur = DerivedColumn::rate("MC_EUR_Billion", "MC_USD_Billion", "EUR");

        let a = derive_columns(set.clone(), &[gbp.clone(), eur.clone()], &rates()).unwrap();
        let b = derive_columns(set, &[eur, gbp], &rates()).unwrap();

        for field in ["MC_GBP_Billion", "MC_EUR_Billion"] {
            assert_eq!(a.column(field), b.column(field));
        }
    }

    #[test]
    fn test_text_or_unknown_source_is_rejected() {
        assert!(derive_column(usd_set(&[]), "Nope", 1.0, "X").is_err());
        assert!(derive_column(usd_set(&[Value::Number(1.0)]), "Name", 1.0, "X").is_err());
    }

    #[test]
    fn test_existing_field_name_is_rejected() {
        let set = usd_set(&[Value::Number(1.0)]);
        assert!(derive_column(set, "MC_USD_Billion", 1.0, "Name").is_err());
    }
}
