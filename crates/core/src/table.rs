//! Row-set decoding with a fixed column contract.
//!
//! A table is checked as a whole before any row is touched: a missing
//! required column is a fatal schema error. After that each row is decoded
//! on its own and bad rows are dropped and counted, never raised.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::records::Record;

/// Field name used when a row fails to decode as a whole.
pub const ROW_DECODE_FIELD: &str = "_row";

/// A table of JSON objects.
///
/// Deserializes from either `{"columns": [...], "rows": [...]}` or a bare
/// array of row objects. With no declared columns the header is the union of
/// all row keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RowSetRepr")]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowSetRepr {
    Rows(Vec<Map<String, Value>>),
    Table {
        #[serde(default)]
        columns: Vec<String>,
        #[serde(default)]
        rows: Vec<Map<String, Value>>,
    },
}

impl From<RowSetRepr> for RowSet {
    fn from(repr: RowSetRepr) -> Self {
        match repr {
            RowSetRepr::Rows(rows) => Self::from_rows(rows),
            RowSetRepr::Table { columns, rows } => Self { columns, rows },
        }
    }
}

impl RowSet {
    /// Table with an inferred header.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    /// Serializes typed records into a row-set with an inferred header.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
        let rows = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                other => Err(Error::internal(format!(
                    "record serialized to non-object JSON: {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Effective header: declared columns, or the union of row keys.
    pub fn column_names(&self) -> BTreeSet<&str> {
        if self.columns.is_empty() {
            self.rows
                .iter()
                .flat_map(|row| row.keys().map(String::as_str))
                .collect()
        } else {
            self.columns.iter().map(String::as_str).collect()
        }
    }

    /// Fails with a schema error on the first required column not in the header.
    ///
    /// A table with no rows and no declared columns has nothing to check.
    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<()> {
        let present = self.column_names();
        if present.is_empty() {
            return Ok(());
        }
        match required.iter().find(|column| !present.contains(**column)) {
            Some(missing) => Err(Error::missing_column(table, *missing)),
            None => Ok(()),
        }
    }
}

/// Per-table counts of accepted and dropped rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_records: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    /// Dropped rows keyed by the first field that failed
    pub errors_by_field: BTreeMap<String, u64>,
}

impl ValidationStats {
    pub fn record_valid(&mut self) {
        self.total_records += 1;
        self.valid_records += 1;
    }

    pub fn record_invalid(&mut self, field: impl Into<String>) {
        self.total_records += 1;
        self.invalid_records += 1;
        *self.errors_by_field.entry(field.into()).or_insert(0) += 1;
    }

    /// Moves an already-accepted row to the invalid side.
    pub fn reject_valid(&mut self, field: impl Into<String>) {
        self.valid_records = self.valid_records.saturating_sub(1);
        self.invalid_records += 1;
        *self.errors_by_field.entry(field.into()).or_insert(0) += 1;
    }

    /// Percentage of rows that survived decoding (0 for an empty table).
    pub fn validation_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (self.valid_records as f64 / self.total_records as f64) * 100.0
    }
}

/// Decoded records plus the stats of what was dropped.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub stats: ValidationStats,
}

/// Decodes a single row, returning the failing field name on error.
fn decode_row<T: Record>(row: &Map<String, Value>) -> std::result::Result<T, String> {
    if let Some(column) = T::NON_NULL_COLUMNS
        .iter()
        .find(|column| row.get(**column).map_or(true, Value::is_null))
    {
        return Err((*column).to_string());
    }

    let record: T = serde_json::from_value(Value::Object(row.clone())).map_err(|e| {
        debug!(table = T::TABLE, error = %e, "Row failed to decode");
        ROW_DECODE_FIELD.to_string()
    })?;

    if let Err(errors) = record.validate() {
        let field = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .min()
            .unwrap_or_else(|| ROW_DECODE_FIELD.to_string());
        return Err(field);
    }

    Ok(record)
}

/// Checks the column contract, then decodes every row that passes validation.
pub fn decode<T: Record>(table: &RowSet) -> Result<Decoded<T>> {
    table.require_columns(T::TABLE, T::REQUIRED_COLUMNS)?;

    let mut records = Vec::with_capacity(table.len());
    let mut stats = ValidationStats::default();

    for row in &table.rows {
        match decode_row::<T>(row) {
            Ok(record) => {
                stats.record_valid();
                records.push(record);
            }
            Err(field) => stats.record_invalid(field),
        }
    }

    if stats.invalid_records > 0 {
        warn!(
            table = T::TABLE,
            total = stats.total_records,
            dropped = stats.invalid_records,
            errors_by_field = ?stats.errors_by_field,
            "Dropped invalid rows"
        );
    }
    debug!(table = T::TABLE, decoded = records.len(), "Decoded table");

    Ok(Decoded { records, stats })
}
