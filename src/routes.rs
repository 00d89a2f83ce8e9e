use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::handlers::{self, auth, bootcamps, courses, reviews, users};

/// The complete application router with global middleware applied.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can key on the peer address.
pub fn app(ctx: AppContext) -> Router {
    let body_limit = ctx.config.api.max_request_size_bytes;
    let api = rate_limited(api_routes(), &ctx.config.api);

    Router::new()
        // Public
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
        .with_state(ctx)
}

/// Per-IP quota of `rate_limit_requests` every `rate_limit_window_secs`.
fn rate_limited(router: Router<AppContext>, api: &ApiConfig) -> Router<AppContext> {
    if api.rate_limit_requests == 0 {
        return router;
    }
    let window = Duration::from_secs(api.rate_limit_window_secs.max(1));
    // One slot of the quota comes back every window / requests
    let period = (window / api.rate_limit_requests).max(Duration::from_millis(1));

    let Some(config) = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(api.rate_limit_requests)
        .finish()
    else {
        tracing::warn!("Invalid rate limit settings, requests are not throttled");
        return router;
    };

    router
        .layer(GovernorLayer { config: Arc::new(config) })
        .layer(map_response(rate_limit_envelope))
}

async fn rate_limit_envelope(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }
    let retry_after = response.headers().get(header::RETRY_AFTER).cloned();
    let mut limited =
        ApiError::too_many_requests("Too many requests from this IP, please try again later").into_response();
    if let Some(value) = retry_after {
        limited.headers_mut().insert(header::RETRY_AFTER, value);
    }
    limited
}

fn api_routes() -> Router<AppContext> {
    Router::new()
        .merge(auth_routes())
        .merge(bootcamp_routes())
        .merge(course_routes())
        .merge(review_routes())
        .merge(user_routes())
}

fn auth_routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/updateDetails", put(auth::update_details))
        .route("/auth/updatePassword", put(auth::update_password))
        .route("/auth/forgotPassword", post(auth::forgot_password))
        .route("/auth/resetPassword/:token", put(auth::reset_password))
}

fn bootcamp_routes() -> Router<AppContext> {
    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route(
            "/bootcamps/:id",
            get(bootcamps::get).put(bootcamps::update).delete(bootcamps::delete),
        )
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::radius))
        // Nested children share the `:id` segment name with the routes above
        .route(
            "/bootcamps/:id/courses",
            get(courses::for_bootcamp).post(courses::create),
        )
        .route(
            "/bootcamps/:id/reviews",
            get(reviews::for_bootcamp).post(reviews::create),
        )
}

fn course_routes() -> Router<AppContext> {
    Router::new()
        .route("/courses", get(courses::list))
        .route(
            "/courses/:id",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
}

fn review_routes() -> Router<AppContext> {
    Router::new()
        .route("/reviews", get(reviews::list))
        .route(
            "/reviews/:id",
            get(reviews::get).put(reviews::update).delete(reviews::delete),
        )
}

fn user_routes() -> Router<AppContext> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}
