//! Folder handlers for Web API.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, CreateFolderRequest, FolderQuery, FolderResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /api/folders - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let folder = state
        .file_service()
        .create_folder(claims.sub, &req.name, req.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(folder.into()))))
}

/// GET /api/folders - List the caller's folders.
///
/// With `?parent_id=` only that folder's direct children are returned.
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<FolderQuery>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let folders = state
        .file_service()
        .list_folders(claims.sub, query.parent_id)
        .await?;

    Ok(Json(ApiResponse::new(
        folders.into_iter().map(FolderResponse::from).collect(),
    )))
}

/// GET /api/folders/:id - Get folder details.
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(folder_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state.file_service().get_folder(claims.sub, folder_id).await?;
    Ok(Json(ApiResponse::new(folder.into())))
}

/// GET /api/folders/:id/path - Breadcrumb from the root to this folder.
pub async fn get_folder_path(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(folder_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let path = state.file_service().folder_path(claims.sub, folder_id).await?;

    Ok(Json(ApiResponse::new(
        path.into_iter().map(FolderResponse::from).collect(),
    )))
}

/// DELETE /api/folders/:id - Delete a folder and everything in it.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(folder_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.file_service().delete_folder(claims.sub, folder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
