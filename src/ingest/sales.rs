use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{RowError, mark_cleaned, persist_raw, reject};
use crate::error::Result;
use crate::scope::ScopedBusiness;
use crate::store::Store;
use crate::types::{RawRow, RawValue, RecordKind, SalesRecord};

const REQUIRED_COLUMNS: [&str; 3] = ["product_name", "date", "quantity"];
pub const DEFAULT_CHANNEL: &str = "offline";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesImportSummary {
    pub cleaned: usize,
    pub errors: usize,
}

/// Body returned for a finished sales upload.
#[derive(Debug, Clone, Serialize)]
pub struct SalesImportReport {
    pub message: &'static str,
    pub results: SalesImportSummary,
}

impl From<SalesImportSummary> for SalesImportReport {
    fn from(results: SalesImportSummary) -> Self {
        Self {
            message: "Sales data import completed",
            results,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SaleOutcome {
    Cleaned(SalesRecord),
    Rejected(RowError),
}

struct SaleFields {
    product_name: String,
    date: NaiveDate,
    quantity: i64,
    revenue: Option<f64>,
    channel: String,
}

fn text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(RawValue::as_text)
}

fn validate(row: &RawRow) -> std::result::Result<SaleFields, RowError> {
    if !REQUIRED_COLUMNS.iter().all(|c| row.has_value(c)) {
        return Err(RowError::MissingSaleFields);
    }

    let quantity = row
        .get("quantity")
        .map(RawValue::as_i64)
        .transpose()
        .map_err(|_| RowError::InvalidQuantity)?
        .flatten()
        .ok_or(RowError::MissingSaleFields)?;
    if quantity <= 0 {
        return Err(RowError::NonPositiveQuantity);
    }

    let date = text(row, "date")
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        .ok_or(RowError::InvalidDate)?;

    let revenue = if row.has_value("revenue") {
        let value = row
            .get("revenue")
            .map(RawValue::as_f64)
            .transpose()
            .map_err(|_| RowError::InvalidRevenue)?
            .flatten()
            .ok_or(RowError::InvalidRevenue)?;
        if value < 0.0 {
            return Err(RowError::NegativeRevenue);
        }
        Some(value)
    } else {
        None
    };

    Ok(SaleFields {
        product_name: text(row, "product_name").ok_or(RowError::MissingSaleFields)?,
        date,
        quantity,
        revenue,
        channel: text(row, "channel").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
    })
}

/// Reconciles one sales row. Unknown products are created on the fly with a
/// zero price; revenue defaults to `price * quantity`.
pub fn reconcile_sale(
    store: &dyn Store,
    scope: &ScopedBusiness,
    row: RawRow,
) -> Result<SaleOutcome> {
    let now = Utc::now();
    let validated = validate(&row);
    let record = persist_raw(store, scope, RecordKind::Sale, row, now)?;

    let fields = match validated {
        Ok(fields) => fields,
        Err(reason) => {
            reject(store, &record, &reason)?;
            return Ok(SaleOutcome::Rejected(reason));
        }
    };

    let product = store.get_or_create_product(scope.id(), &fields.product_name)?;
    let revenue = fields
        .revenue
        .unwrap_or(product.price * fields.quantity as f64);

    let sale = SalesRecord {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        product_id: product.id,
        product_name: product.name,
        date: fields.date,
        quantity: fields.quantity,
        revenue,
        channel: fields.channel,
        created_at: now,
    };
    store.create_sale(&sale)?;
    mark_cleaned(store, &record)?;

    Ok(SaleOutcome::Cleaned(sale))
}

/// Runs every row through [`reconcile_sale`] in order and tallies the outcomes.
pub fn import_sales(
    store: &dyn Store,
    scope: &ScopedBusiness,
    rows: Vec<RawRow>,
) -> Result<SalesImportSummary> {
    let mut summary = SalesImportSummary::default();

    for row in rows {
        match reconcile_sale(store, scope, row)? {
            SaleOutcome::Cleaned(_) => summary.cleaned += 1,
            SaleOutcome::Rejected(_) => summary.errors += 1,
        }
    }

    tracing::info!(
        business = %scope.business().slug,
        cleaned = summary.cleaned,
        errors = summary.errors,
        "sales import finished"
    );

    Ok(summary)
}
