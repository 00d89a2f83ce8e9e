// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:bootcampId/courses handlers

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::{schema::COURSES, ListQuery};
use crate::middleware::{
    ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Authorized, CollectionResponse, ListResponse,
};
use crate::models::{Course, CourseInput};
use crate::policy::Publishers;
use crate::services::CourseService;

/// GET /api/v1/courses - advanced results with bootcamp summaries
pub async fn list(
    State(ctx): State<AppContext>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = ListQuery::parse(&params, &COURSES, &ctx.config.api)?;
    let page = CourseService::new(&ctx).list(&query).await?;
    Ok(ListResponse::new(page, &query))
}

/// GET /api/v1/bootcamps/:bootcampId/courses
pub async fn for_bootcamp(
    State(ctx): State<AppContext>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
) -> Result<CollectionResponse<Course>, ApiError> {
    let courses = CourseService::new(&ctx).for_bootcamp(bootcamp_id).await?;
    Ok(CollectionResponse(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(State(ctx): State<AppContext>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Value> {
    Ok(ApiResponse::success(CourseService::new(&ctx).get(id).await?))
}

/// POST /api/v1/bootcamps/:bootcampId/courses - bootcamp owner or admin
pub async fn create(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<Course> {
    let course = CourseService::new(&ctx)
        .create(&auth.principal(), bootcamp_id, input)
        .await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<Course> {
    let course = CourseService::new(&ctx).update(&auth.principal(), id, input).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    State(ctx): State<AppContext>,
    auth: Authorized<Publishers>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    CourseService::new(&ctx).delete(&auth.principal(), id).await?;
    Ok(ApiResponse::success(serde_json::json!({})))
}
