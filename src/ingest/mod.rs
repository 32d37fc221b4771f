//! Raw-to-clean reconciliation of uploaded product and sales rows.
//!
//! Uploads are decoded in full by [`read_csv`] before any row is touched, so a
//! malformed file fails as a whole. Each decoded row is then persisted as a
//! [`RawRecord`](crate::types::RawRecord) and reconciled on its own: a row that
//! fails validation is marked `error` with a readable message and the batch
//! moves on.

mod products;
mod sales;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scope::ScopedBusiness;
use crate::store::Store;
use crate::types::{RawRecord, RawRow, RawValue, RecordKind, RecordStatus};

pub use products::{
    ProductImportReport, ProductImportSummary, ProductOutcome, import_products, reconcile_product,
};
pub use sales::{
    DEFAULT_CHANNEL, SaleOutcome, SalesImportReport, SalesImportSummary, import_sales,
    reconcile_sale,
};

/// Why a single row was rejected. The message is what ends up in the raw
/// record's `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Missing required product name")]
    MissingProductName,
    #[error("Price must be a number")]
    InvalidPrice,
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Cost price must be a number")]
    InvalidCostPrice,
    #[error("Cost price cannot be negative")]
    NegativeCostPrice,
    #[error("Missing required fields")]
    MissingSaleFields,
    #[error("Quantity must be a number")]
    InvalidQuantity,
    #[error("Quantity must be positive")]
    NonPositiveQuantity,
    #[error("Date must be in YYYY-MM-DD format")]
    InvalidDate,
    #[error("Revenue must be a number")]
    InvalidRevenue,
    #[error("Revenue cannot be negative")]
    NegativeRevenue,
}

/// Decodes a CSV upload into typed rows.
///
/// The first record is the header row; header names are trimmed and must be
/// unique and non-empty. Ragged rows and invalid UTF-8 fail the whole batch.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(Error::BatchParse("CSV file has no header row".to_string()));
    }

    let mut seen = HashSet::new();
    for name in &headers {
        if name.is_empty() {
            return Err(Error::BatchParse(
                "CSV header contains an empty column name".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(Error::BatchParse(format!(
                "CSV header repeats column '{name}'"
            )));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column, RawValue::infer(cell)))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Appends the untouched row to the audit log.
fn persist_raw(
    store: &dyn Store,
    scope: &ScopedBusiness,
    kind: RecordKind,
    row: RawRow,
    uploaded_at: DateTime<Utc>,
) -> Result<RawRecord> {
    let record = RawRecord {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        kind,
        raw_row: row,
        status: RecordStatus::Raw,
        error_message: None,
        uploaded_at,
    };
    store.create_raw_record(&record)?;
    Ok(record)
}

fn reject(store: &dyn Store, record: &RawRecord, reason: &RowError) -> Result<()> {
    let message = reason.to_string();
    tracing::debug!(record_id = %record.id, kind = %record.kind, reason = %message, "row rejected");
    store.mark_raw_record(&record.id, RecordStatus::Error, Some(&message))
}

fn mark_cleaned(store: &dyn Store, record: &RawRecord) -> Result<()> {
    store.mark_raw_record(&record.id, RecordStatus::Cleaned, None)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    #[test]
    fn test_read_csv_types_cells_and_trims_headers() {
        let csv = b" name ,price,organic,code\nSoap,100,true,007\nCandle,,FALSE,12\n";
        let rows = read_csv(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&RawValue::Text("Soap".into())));
        assert_eq!(
            rows[0].get("price"),
            Some(&RawValue::Number(Number::from(100)))
        );
        assert_eq!(rows[0].get("organic"), Some(&RawValue::Boolean(true)));
        assert_eq!(rows[0].get("code"), Some(&RawValue::Text("007".into())));
        assert_eq!(rows[1].get("price"), Some(&RawValue::Empty));
        assert_eq!(rows[1].get("organic"), Some(&RawValue::Boolean(false)));
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let result = read_csv(b"name,price\nSoap,100,extra\n");
        assert!(matches!(result, Err(Error::BatchParse(_))));
    }

    #[test]
    fn test_read_csv_rejects_bad_headers() {
        assert!(matches!(read_csv(b""), Err(Error::BatchParse(_))));
        assert!(matches!(
            read_csv(b"name,name\nSoap,Candle\n"),
            Err(Error::BatchParse(_))
        ));
        assert!(matches!(
            read_csv(b"name,,price\nSoap,x,1\n"),
            Err(Error::BatchParse(_))
        ));
    }

    #[test]
    fn test_read_csv_rejects_invalid_utf8() {
        let result = read_csv(b"name,price\n\xff\xfe,1\n");
        assert!(matches!(result, Err(Error::BatchParse(_))));
    }

    #[test]
    fn test_read_csv_header_only_is_empty_batch() {
        assert!(read_csv(b"name,price\n").unwrap().is_empty());
    }
}
