use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::ListRawRecordsParams;
use crate::server::response::{
    ApiError, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::store::RawRecordFilter;

use super::scope;

pub async fn list_raw_records(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<ListRawRecordsParams>,
) -> impl IntoResponse {
    let scope = scope(&state, &auth.user, &slug)?;
    let cursor = params.cursor.as_deref().unwrap_or("");
    let filter = RawRecordFilter {
        kind: params.kind,
        status: params.status,
    };

    let records = state
        .store
        .list_raw_records(scope.id(), filter, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list raw records")?;

    let (records, next_cursor, has_more) =
        paginate(records, DEFAULT_PAGE_SIZE as usize, |r| r.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(records, next_cursor, has_more)))
}
