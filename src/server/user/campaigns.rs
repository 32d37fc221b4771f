use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::campaign::{self, CampaignRequest};
use crate::server::AppState;
use crate::server::dto::CampaignResponse;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

use super::scope;

pub async fn list_campaigns(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let campaigns: Vec<CampaignResponse> = state
        .store
        .list_campaigns(scope.id())
        .api_err("Failed to list campaigns")?
        .into_iter()
        .map(CampaignResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(campaigns)))
}

pub async fn create_campaign(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<CampaignRequest>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let campaign = campaign::create_campaign(state.store.as_ref(), &scope, req, &state.currency)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CampaignResponse::from(campaign))),
    ))
}

pub async fn get_campaign(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let campaign = state
        .store
        .get_campaign(scope.id(), &id)
        .api_err("Failed to get campaign")?
        .or_not_found("Campaign not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(CampaignResponse::from(campaign))))
}
