use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::ingest::{DEFAULT_CHANNEL, SalesImportReport, import_sales};
use crate::server::AppState;
use crate::server::dto::{CreateSaleRequest, UpdateSaleRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::SalesRecord;

use super::scope;
use super::uploads::{read_file_field, run_import};

fn require_positive(quantity: i64) -> Result<i64, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::bad_request("Quantity must be positive"));
    }
    Ok(quantity)
}

fn channel_or_default(channel: Option<String>) -> String {
    channel
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
}

pub async fn list_sales(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let sales = state
        .store
        .list_sales(scope.id())
        .api_err("Failed to list sales")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sales)))
}

pub async fn create_sale(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<CreateSaleRequest>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;
    let quantity = require_positive(req.quantity)?;

    let product = state
        .store
        .get_product(scope.id(), &req.product_id)
        .api_err("Failed to get product")?
        .or_not_found("Product not found")?;

    let sale = SalesRecord {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        revenue: product.price * quantity as f64,
        product_id: product.id,
        product_name: product.name,
        date: req.date,
        quantity,
        channel: channel_or_default(req.channel),
        created_at: Utc::now(),
    };

    state
        .store
        .create_sale(&sale)
        .api_err("Failed to create sale")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(sale))))
}

pub async fn update_sale(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    Json(req): Json<UpdateSaleRequest>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let mut sale = state
        .store
        .get_sale(scope.id(), &id)
        .api_err("Failed to get sale")?
        .or_not_found("Sale not found")?;

    if let Some(quantity) = req.quantity {
        sale.quantity = require_positive(quantity)?;
    }
    if let Some(date) = req.date {
        sale.date = date;
    }
    if req.channel.is_some() {
        sale.channel = channel_or_default(req.channel);
    }

    let product = state
        .store
        .get_product(scope.id(), &sale.product_id)
        .api_err("Failed to get product")?
        .or_not_found("Product not found")?;
    sale.revenue = product.price * sale.quantity as f64;

    state
        .store
        .update_sale(&sale)
        .api_err("Failed to update sale")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sale)))
}

pub async fn delete_sale(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let deleted = state
        .store
        .delete_sale(scope.id(), &id)
        .api_err("Failed to delete sale")?;

    if !deleted {
        return Err(ApiError::not_found("Sale not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_sales(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;
    let bytes = read_file_field(&mut multipart, state.max_upload_bytes).await?;

    let results = run_import(&state, scope, bytes, import_sales).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(SalesImportReport::from(results))))
}
