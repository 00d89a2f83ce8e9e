// handlers/auth.rs - /api/v1/auth handlers

use axum::{
    extract::State,
    http::{header, HeaderMap},
};
use serde_json::json;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::middleware::{
    ApiJson, ApiPath, ApiResponse, ApiResult, CurrentUser, LogoutResponse, TokenResponse,
};
use crate::models::{User, UserInput};
use crate::services::auth_service::{DetailsInput, ForgotInput, LoginInput, PasswordChange, ResetInput};
use crate::services::AuthService;

/// POST /api/v1/auth/register
pub async fn register(
    State(ctx): State<AppContext>,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<TokenResponse, ApiError> {
    let user = AuthService::new(&ctx).register(input).await?;
    Ok(TokenResponse::issue(user.id, &ctx.config.security)?.created())
}

/// POST /api/v1/auth/login
pub async fn login(
    State(ctx): State<AppContext>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<TokenResponse, ApiError> {
    let user = AuthService::new(&ctx).login(input).await?;
    TokenResponse::issue(user.id, &ctx.config.security)
}

/// GET /api/v1/auth/logout
pub async fn logout(State(ctx): State<AppContext>, _user: CurrentUser) -> LogoutResponse {
    LogoutResponse::new(&ctx.config.security)
}

/// GET /api/v1/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/auth/updateDetails
pub async fn update_details(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<DetailsInput>,
) -> ApiResult<User> {
    let user = AuthService::new(&ctx).update_details(user.id, input).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/auth/updatePassword - answers with a fresh token
pub async fn update_password(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<PasswordChange>,
) -> Result<TokenResponse, ApiError> {
    let user = AuthService::new(&ctx).update_password(user.id, input).await?;
    TokenResponse::issue(user.id, &ctx.config.security)
}

/// POST /api/v1/auth/forgotPassword
pub async fn forgot_password(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<ForgotInput>,
) -> ApiResult<serde_json::Value> {
    let base_url = base_url(&ctx, &headers);
    AuthService::new(&ctx).forgot_password(input, &base_url).await?;
    Ok(ApiResponse::success(json!("Email sent")))
}

/// PUT /api/v1/auth/resetPassword/:token
pub async fn reset_password(
    State(ctx): State<AppContext>,
    ApiPath(token): ApiPath<String>,
    ApiJson(input): ApiJson<ResetInput>,
) -> Result<TokenResponse, ApiError> {
    let user = AuthService::new(&ctx).reset_password(&token, input).await?;
    TokenResponse::issue(user.id, &ctx.config.security)
}

/// Configured public URL, else the request's Host header.
fn base_url(ctx: &AppContext, headers: &HeaderMap) -> String {
    if let Some(url) = &ctx.config.server.public_url {
        return url.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| ctx.config.addr());
    let scheme = if ctx.config.security.secure_cookies { "https" } else { "http" };
    format!("{}://{}", scheme, host)
}
