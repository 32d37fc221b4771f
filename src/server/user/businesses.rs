use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::CreateBusinessRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{slugify, validate_business_name};
use crate::types::Business;

use super::{owner_scope, scope};

/// Attempts at a unique slug before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 100;

pub async fn list_businesses(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let businesses = state
        .store
        .list_user_businesses(&auth.user.id)
        .api_err("Failed to list businesses")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(businesses)))
}

pub async fn create_business(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBusinessRequest>,
) -> impl IntoResponse {
    let name = req.name.trim().to_string();
    validate_business_name(&name)?;

    let base = slugify(&name);
    let mut business = Business {
        id: Uuid::new_v4().to_string(),
        owner_id: auth.user.id.clone(),
        name,
        slug: base.clone(),
        industry: req.industry.map(|s| s.trim().to_string()).unwrap_or_default(),
        location: req.location.map(|s| s.trim().to_string()).unwrap_or_default(),
        created_at: Utc::now(),
    };

    // Common names collide; suffix a counter until the slug is free.
    for attempt in 0..MAX_SLUG_ATTEMPTS {
        if attempt > 0 {
            business.slug = format!("{base}-{attempt}");
        }

        match state.store.create_business(&business) {
            Ok(()) => {
                tracing::info!(business = %business.slug, owner = %business.owner_id, "business created");
                return Ok((StatusCode::CREATED, Json(ApiResponse::success(business))));
            }
            Err(Error::AlreadyExists) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create business")),
        }
    }

    Err(ApiError::conflict("Could not find a free slug for this name"))
}

pub async fn get_business(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(scope.business().clone())))
}

pub async fn delete_business(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = owner_scope(&state, &auth.user, &slug)?;

    state
        .store
        .delete_business(scope.id())
        .api_err("Failed to delete business")?;

    tracing::info!(business = %slug, "business deleted");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
