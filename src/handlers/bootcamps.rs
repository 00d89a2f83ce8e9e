// handlers/bootcamps.rs - /api/v1/bootcamps handlers

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::{schema::BOOTCAMPS, ListQuery};
use crate::middleware::{
    ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Authorized, CollectionResponse, ListResponse,
};
use crate::models::{Bootcamp, BootcampInput};
use crate::policy::Publishers;
use crate::services::BootcampService;

/// GET /api/v1/bootcamps - advanced results, each bootcamp with its courses
pub async fn list(
    State(ctx): State<AppContext>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = ListQuery::parse(&params, &BOOTCAMPS, &ctx.config.api)?;
    let page = BootcampService::new(&ctx).list(&query).await?;
    Ok(ListResponse::new(page, &query))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(ctx): State<AppContext>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&ctx).get(id).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps - publishers and admins; one bootcamp per publisher
pub async fn create(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiJson(input): ApiJson<BootcampInput>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&ctx).create(&auth.principal(), input).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<BootcampInput>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&ctx).update(&auth.principal(), id, input).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// DELETE /api/v1/bootcamps/:id - cascades to courses and reviews
pub async fn delete(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    BootcampService::new(&ctx).delete(&auth.principal(), id).await?;
    Ok(ApiResponse::success(serde_json::json!({})))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in miles
pub async fn radius(
    State(ctx): State<AppContext>,
    ApiPath((zipcode, distance)): ApiPath<(String, String)>,
) -> Result<CollectionResponse<Bootcamp>, ApiError> {
    let distance: f64 = distance
        .parse()
        .map_err(|_| ApiError::bad_request("Please provide a valid distance"))?;
    let bootcamps = BootcampService::new(&ctx).within_radius(&zipcode, distance).await?;
    Ok(CollectionResponse(bootcamps))
}
