// handlers/reviews.rs - /api/v1/reviews and /api/v1/bootcamps/:bootcampId/reviews handlers

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::{schema::REVIEWS, ListQuery};
use crate::middleware::{
    ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Authorized, CollectionResponse, ListResponse,
};
use crate::models::{Review, ReviewInput};
use crate::policy::Reviewers;
use crate::services::ReviewService;

pub async fn list(
    State(ctx): State<AppContext>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = ListQuery::parse(&params, &REVIEWS, &ctx.config.api)?;
    let page = ReviewService::new(&ctx).list(&query).await?;
    Ok(ListResponse::new(page, &query))
}

pub async fn for_bootcamp(
    State(ctx): State<AppContext>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
) -> Result<CollectionResponse<Review>, ApiError> {
    let reviews = ReviewService::new(&ctx).for_bootcamp(bootcamp_id).await?;
    Ok(CollectionResponse(reviews))
}

pub async fn get(State(ctx): State<AppContext>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Value> {
    Ok(ApiResponse::success(ReviewService::new(&ctx).get(id).await?))
}

/// POST /api/v1/bootcamps/:bootcampId/reviews - users and admins, once per bootcamp
pub async fn create(
    State(ctx): State<AppContext>,
    auth: Authorized<Reviewers>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&ctx)
        .create(&auth.principal(), bootcamp_id, input)
        .await?;
    Ok(ApiResponse::created(review))
}

pub async fn update(
    State(ctx): State<AppContext>,
    auth: Authorized<Reviewers>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&ctx).update(&auth.principal(), id, input).await?;
    Ok(ApiResponse::success(review))
}

pub async fn delete(
    State(ctx): State<AppContext>,
    auth: Authorized<Reviewers>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    ReviewService::new(&ctx).delete(&auth.principal(), id).await?;
    Ok(ApiResponse::success(serde_json::json!({})))
}
