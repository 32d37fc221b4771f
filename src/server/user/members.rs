use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::AddMemberRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::{BusinessMember, MemberRole};

use super::{owner_scope, scope};

pub async fn list_members(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;

    let members = state
        .store
        .list_members(scope.id())
        .api_err("Failed to list members")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

pub async fn add_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> impl IntoResponse {
    let scope = owner_scope(&state, &auth.user, &slug)?;

    let role = req.role.unwrap_or(MemberRole::Staff);
    if role == MemberRole::Owner {
        return Err(ApiError::bad_request("A business has exactly one owner"));
    }

    let user = state
        .store
        .get_user(&req.user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if user.id == scope.business().owner_id {
        return Err(ApiError::conflict("User already owns this business"));
    }

    let member = BusinessMember {
        business_id: scope.id().to_string(),
        user_id: user.id,
        role,
        active: true,
        joined_at: Utc::now(),
    };

    state
        .store
        .upsert_member(&member)
        .api_err("Failed to add member")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(member))))
}

pub async fn deactivate_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let scope = owner_scope(&state, &auth.user, &slug)?;

    if user_id == scope.business().owner_id {
        return Err(ApiError::bad_request("The owner cannot be removed"));
    }

    let updated = state
        .store
        .set_member_active(scope.id(), &user_id, false)
        .api_err("Failed to update member")?;

    if !updated {
        return Err(ApiError::not_found("Member not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
