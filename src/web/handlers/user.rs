//! User handlers for Web API.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::web::dto::{ApiResponse, StorageResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/users/storage - Quota usage of the current user.
pub async fn get_storage(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<StorageResponse>>, ApiError> {
    let usage = state.file_service().storage_usage(claims.sub).await?;
    Ok(Json(ApiResponse::new(usage.into())))
}
