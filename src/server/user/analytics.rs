use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::analytics::analyze;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

use super::scope;

pub async fn get_analytics(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let analytics = analyze(state.store.as_ref(), &scope).api_err("Failed to compute analytics")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(analytics)))
}
