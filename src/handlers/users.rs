// handlers/users.rs - /api/v1/users handlers (admin only)

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::{schema::USERS, ListQuery};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Authorized, ListResponse};
use crate::models::{User, UserInput};
use crate::policy::Admins;
use crate::services::UserService;

pub async fn list(
    State(ctx): State<AppContext>,
    _auth: Authorized<Admins>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = ListQuery::parse(&params, &USERS, &ctx.config.api)?;
    let page = UserService::new(&ctx).list(&query).await?;
    Ok(ListResponse::new(page, &query))
}

pub async fn get(
    State(ctx): State<AppContext>,
    _auth: Authorized<Admins>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(UserService::new(&ctx).get(id).await?))
}

pub async fn create(
    State(ctx): State<AppContext>,
    _auth: Authorized<Admins>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<User> {
    Ok(ApiResponse::created(UserService::new(&ctx).create(input).await?))
}

pub async fn update(
    State(ctx): State<AppContext>,
    _auth: Authorized<Admins>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(UserService::new(&ctx).update(id, input).await?))
}

pub async fn delete(
    State(ctx): State<AppContext>,
    _auth: Authorized<Admins>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    UserService::new(&ctx).delete(id).await?;
    Ok(ApiResponse::success(serde_json::json!({})))
}
