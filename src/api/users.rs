//! `/api/users` handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::error::{ApiJson, ApiResult};
use super::AppState;
use crate::auth::{IdentityLoginRequest, LoginRequest, ProfileUpdate, RegisterRequest};
use crate::entity::{AuthResponse, UserProfile};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.login(request).await?))
}

pub async fn google(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdentityLoginRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (response, created) = state
        .auth
        .login_with_identity_provider(&request.token)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(user.profile())
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.update_profile(user.id, update).await?))
}

pub async fn upgrade_premium(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.upgrade_to_premium(user.id).await?))
}
