use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::marker::PhantomData;

use crate::auth::validate_jwt;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::models::User;
use crate::policy::{ensure_role, Principal, RouteScope};

pub const TOKEN_COOKIE: &str = "token";

/// The authenticated user, loaded fresh from the store on every request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(not_authorized)?;
        let claims = validate_jwt(&token, &ctx.config.security)?;

        // A valid token for a deleted user is still unauthorized
        let user = ctx.stores.users.find_user(claims.id).await?.ok_or_else(not_authorized)?;
        Ok(CurrentUser(user))
    }
}

/// An authenticated user whose role is on `S`'s allow-list.
pub struct Authorized<S: RouteScope> {
    pub user: User,
    _scope: PhantomData<S>,
}

impl<S: RouteScope> Authorized<S> {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.user)
    }
}

#[axum::async_trait]
impl<S: RouteScope> FromRequestParts<AppContext> for Authorized<S> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, ctx).await?;
        ensure_role::<S>(&Principal::from(&user))?;
        Ok(Self {
            user,
            _scope: PhantomData,
        })
    }
}

fn not_authorized() -> ApiError {
    ApiError::unauthorized("Not authorized to access this route")
}

/// Bearer header first, then the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
