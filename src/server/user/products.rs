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
use crate::error::Error;
use crate::ingest::{ProductImportReport, import_products};
use crate::server::AppState;
use crate::server::dto::{CreateProductRequest, UpdateProductRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_money, validate_product_name};
use crate::types::Product;

use super::scope;
use super::uploads::{read_file_field, run_import};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_products(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let products = state
        .store
        .list_products(scope.id())
        .api_err("Failed to list products")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(products)))
}

pub async fn create_product(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<CreateProductRequest>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let name = req.name.trim().to_string();
    validate_product_name(&name)?;
    let price = req.price.unwrap_or(0.0);
    let cost_price = req.cost_price.unwrap_or(0.0);
    validate_money(price, "Price")?;
    validate_money(cost_price, "Cost price")?;

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        name,
        sku: non_empty(req.sku),
        category: non_empty(req.category).unwrap_or_default(),
        price,
        cost_price,
        attributes: req.attributes,
        created_at: now,
        updated_at: now,
    };

    match state.store.create_product(&product) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("Product already exists"));
        }
        Err(_) => return Err(ApiError::internal("Failed to create product")),
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

pub async fn update_product(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    Json(req): Json<UpdateProductRequest>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let mut product = state
        .store
        .get_product(scope.id(), &id)
        .api_err("Failed to get product")?
        .or_not_found("Product not found")?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        validate_product_name(&name)?;
        product.name = name;
    }
    if let Some(price) = req.price {
        validate_money(price, "Price")?;
        product.price = price;
    }
    if let Some(cost_price) = req.cost_price {
        validate_money(cost_price, "Cost price")?;
        product.cost_price = cost_price;
    }
    if let Some(category) = req.category {
        product.category = category.trim().to_string();
    }
    if req.sku.is_some() {
        product.sku = non_empty(req.sku);
    }
    if let Some(attributes) = req.attributes {
        product.attributes = attributes;
    }
    product.updated_at = Utc::now();

    match state.store.update_product(&product) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("Product name already exists"));
        }
        Err(Error::NotFound) => return Err(ApiError::not_found("Product not found")),
        Err(_) => return Err(ApiError::internal("Failed to update product")),
    }

    Ok(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let deleted = state
        .store
        .delete_product(scope.id(), &id)
        .api_err("Failed to delete product")?;

    if !deleted {
        return Err(ApiError::not_found("Product not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_products(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;
    let bytes = read_file_field(&mut multipart, state.max_upload_bytes).await?;

    let summary = run_import(&state, scope, bytes, import_products).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ProductImportReport::from(
        summary,
    ))))
}
