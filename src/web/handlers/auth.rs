//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest};
use crate::datetime::days_from_now;
use crate::db::User;
use crate::web::dto::{
    ApiResponse, AuthResponse, LoginRequest, LogoutRequest, MeResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::VaultError;

/// Issue an access token plus a persisted refresh token for `user`.
async fn issue_tokens(state: &AppState, user: &User) -> Result<(String, String), ApiError> {
    let claims = JwtClaims::new(user.id, &user.username, state.access_token_expiry);
    let access_token = state.jwt.issue(&claims)?;

    let refresh_token = uuid::Uuid::new_v4().to_string();
    let expires_at = days_from_now(state.refresh_token_expiry_days as i64);
    state
        .storage
        .create_refresh_token(user.id, &refresh_token, &expires_at)
        .await
        .map_err(|e| {
            tracing::error!(user_id = user.id, "Failed to store refresh token: {}", e);
            ApiError::internal("Failed to create session")
        })?;

    Ok((access_token, refresh_token))
}

async fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let (access_token, refresh_token) = issue_tokens(state, user).await?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
        user: UserResponse::from(user),
    })
}

/// POST /api/auth/register - Create an account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let mut request = RegistrationRequest::new(req.username, req.password);
    if let Some(full_name) = req.full_name {
        request = request.with_full_name(full_name);
    }

    let user = auth::register(state.storage.as_ref(), request, state.default_storage_limit)
        .await
        .map_err(VaultError::from)?;

    let response = auth_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let user = auth::authenticate(state.storage.as_ref(), &req.username, &req.password).await?;

    tracing::info!(user_id = user.id, "User logged in");

    let response = auth_response(&state, &user).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/auth/logout - Revoke a refresh token.
///
/// Unknown tokens are not an error, so logout is idempotent.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.storage.revoke_refresh_token(&req.refresh_token).await?;
    Ok(Json(ApiResponse::new(())))
}

/// POST /api/auth/refresh - Exchange a refresh token for a new pair.
///
/// The presented token is revoked, so each refresh token works once. When
/// two requests race with the same token only the one that revokes it wins.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let token = state
        .storage
        .get_valid_refresh_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = state
        .storage
        .get_user(token.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !state.storage.revoke_refresh_token(&req.refresh_token).await? {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    Ok(Json(ApiResponse::new(RefreshResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
    })))
}

/// GET /api/auth/me - Current user with storage usage.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state
        .storage
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let response = MeResponse {
        storage: user.storage_usage().into(),
        user: UserResponse::from(&user),
    };

    Ok(Json(ApiResponse::new(response)))
}
