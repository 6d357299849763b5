//! Account endpoints.

use axum::extract::State;
use axum::Json;

use crate::common::AppResult;
use crate::domains::auth::actions::{
    self, AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};
use crate::domains::users::models::PublicUser;
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::ApiResponse;

pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = actions::register(&state.deps, request).await?;
    Ok(ApiResponse::ok_with_message(response, "User registered successfully"))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = actions::login(&state.deps, request).await?;
    Ok(ApiResponse::ok(response))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<()>> {
    actions::logout(&state.deps, auth.user_id).await?;
    Ok(ApiResponse::message("Logged out successfully"))
}

pub async fn me_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = actions::me(&state.deps, auth.user_id).await?;
    Ok(ApiResponse::ok(user))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = actions::refresh(&state.deps, auth.user_id).await?;
    Ok(ApiResponse::ok(response))
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    actions::forgot_password(&state.deps, request).await?;
    Ok(ApiResponse::message(
        "If that email is registered, a reset link has been sent",
    ))
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = actions::reset_password(&state.deps, request).await?;
    Ok(ApiResponse::ok_with_message(response, "Password reset successfully"))
}
