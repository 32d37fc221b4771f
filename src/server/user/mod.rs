mod analytics;
mod businesses;
mod campaigns;
mod members;
mod products;
mod raw_records;
mod sales;
mod uploads;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};

use crate::error::Error;
use crate::scope::ScopedBusiness;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::User;

/// Resolves the business in the path for the calling user.
pub(crate) fn scope(state: &AppState, user: &User, slug: &str) -> Result<ScopedBusiness, ApiError> {
    ScopedBusiness::resolve(state.store.as_ref(), user, slug).map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Business not found"),
        other => ApiError::from(other),
    })
}

/// Like [`scope`], restricted to the business owner.
pub(crate) fn owner_scope(
    state: &AppState,
    user: &User,
    slug: &str,
) -> Result<ScopedBusiness, ApiError> {
    scope(state, user, slug)?
        .require_owner()
        .map_err(|_| ApiError::forbidden("Only the business owner can do this"))
}

pub fn user_router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    let upload_limit = DefaultBodyLimit::max(max_upload_bytes);

    Router::new()
        // Businesses
        .route("/businesses", get(businesses::list_businesses))
        .route("/businesses", post(businesses::create_business))
        .route("/businesses/{slug}", get(businesses::get_business))
        .route("/businesses/{slug}", delete(businesses::delete_business))
        // Members
        .route("/businesses/{slug}/members", get(members::list_members))
        .route("/businesses/{slug}/members", post(members::add_member))
        .route(
            "/businesses/{slug}/members/{user_id}",
            delete(members::deactivate_member),
        )
        // Products
        .route("/businesses/{slug}/products", get(products::list_products))
        .route("/businesses/{slug}/products", post(products::create_product))
        .route(
            "/businesses/{slug}/products/upload",
            post(products::upload_products).layer(upload_limit),
        )
        .route(
            "/businesses/{slug}/products/{id}",
            patch(products::update_product),
        )
        .route(
            "/businesses/{slug}/products/{id}",
            delete(products::delete_product),
        )
        // Sales
        .route("/businesses/{slug}/sales", get(sales::list_sales))
        .route("/businesses/{slug}/sales", post(sales::create_sale))
        .route(
            "/businesses/{slug}/sales/upload",
            post(sales::upload_sales).layer(upload_limit),
        )
        .route("/businesses/{slug}/sales/{id}", patch(sales::update_sale))
        .route("/businesses/{slug}/sales/{id}", delete(sales::delete_sale))
        // Audit log
        .route(
            "/businesses/{slug}/raw-records",
            get(raw_records::list_raw_records),
        )
        // Analytics and campaigns
        .route("/businesses/{slug}/analytics", get(analytics::get_analytics))
        .route(
            "/businesses/{slug}/campaigns",
            get(campaigns::list_campaigns),
        )
        .route(
            "/businesses/{slug}/campaigns",
            post(campaigns::create_campaign),
        )
        .route(
            "/businesses/{slug}/campaigns/{id}",
            get(campaigns::get_campaign),
        )
}
