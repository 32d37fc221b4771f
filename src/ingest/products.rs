use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{RowError, mark_cleaned, persist_raw, reject};
use crate::error::Result;
use crate::scope::ScopedBusiness;
use crate::store::Store;
use crate::types::{Product, RawRow, RawValue, RecordKind, Upserted};

/// Columns mapped onto product fields; everything else becomes an attribute.
const RESERVED_COLUMNS: [&str; 4] = ["name", "price", "cost_price", "category"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductImportSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Body returned for a finished product upload.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImportReport {
    pub message: &'static str,
    pub summary: ProductImportSummary,
}

impl From<ProductImportSummary> for ProductImportReport {
    fn from(summary: ProductImportSummary) -> Self {
        Self {
            message: "Product import completed successfully",
            summary,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProductOutcome {
    Created(Product),
    Updated(Product),
    Rejected(RowError),
}

struct ProductFields {
    name: String,
    sku: Option<String>,
    category: String,
    price: f64,
    cost_price: f64,
}

fn money(
    row: &RawRow,
    column: &str,
    invalid: RowError,
    negative: RowError,
) -> std::result::Result<f64, RowError> {
    let value = row
        .get(column)
        .map(RawValue::as_f64)
        .transpose()
        .map_err(|_| invalid)?
        .flatten()
        .unwrap_or(0.0);

    if value < 0.0 {
        return Err(negative);
    }
    Ok(value)
}

fn validate(row: &RawRow) -> std::result::Result<ProductFields, RowError> {
    let name = row
        .get("name")
        .and_then(RawValue::as_text)
        .ok_or(RowError::MissingProductName)?;

    let price = money(row, "price", RowError::InvalidPrice, RowError::NegativePrice)?;
    let cost_price = money(
        row,
        "cost_price",
        RowError::InvalidCostPrice,
        RowError::NegativeCostPrice,
    )?;

    Ok(ProductFields {
        name,
        sku: row.get("sku").and_then(RawValue::as_text),
        category: row
            .get("category")
            .and_then(RawValue::as_text)
            .unwrap_or_default(),
        price,
        cost_price,
    })
}

/// Reconciles one product row: audit it, validate it, then upsert by name.
pub fn reconcile_product(
    store: &dyn Store,
    scope: &ScopedBusiness,
    row: RawRow,
) -> Result<ProductOutcome> {
    let now = Utc::now();
    let validated = validate(&row);
    let attributes = row.without(&RESERVED_COLUMNS);
    let record = persist_raw(store, scope, RecordKind::Product, row, now)?;

    let fields = match validated {
        Ok(fields) => fields,
        Err(reason) => {
            reject(store, &record, &reason)?;
            return Ok(ProductOutcome::Rejected(reason));
        }
    };

    let candidate = Product {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        name: fields.name,
        sku: fields.sku,
        category: fields.category,
        price: fields.price,
        cost_price: fields.cost_price,
        attributes,
        created_at: now,
        updated_at: now,
    };

    let outcome = match store.upsert_product(&candidate)? {
        Upserted::Created(product) => ProductOutcome::Created(product),
        Upserted::Updated(product) => ProductOutcome::Updated(product),
    };
    mark_cleaned(store, &record)?;

    Ok(outcome)
}

/// Runs every row through [`reconcile_product`] in order and tallies the
/// outcomes. Row rejections are counted; store failures abort the batch.
pub fn import_products(
    store: &dyn Store,
    scope: &ScopedBusiness,
    rows: Vec<RawRow>,
) -> Result<ProductImportSummary> {
    let mut summary = ProductImportSummary::default();

    for row in rows {
        match reconcile_product(store, scope, row)? {
            ProductOutcome::Created(_) => summary.created += 1,
            ProductOutcome::Updated(_) => summary.updated += 1,
            ProductOutcome::Rejected(_) => summary.errors += 1,
        }
    }

    tracing::info!(
        business = %scope.business().slug,
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors,
        "product import finished"
    );

    Ok(summary)
}
