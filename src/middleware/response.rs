use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use super::auth::TOKEN_COOKIE;
use crate::auth::issue_token;
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::store::Page;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: Some(StatusCode::CREATED),
        }
    }
}

fn serialize<T: Serialize>(data: &T) -> Result<Value, Response> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        ApiError::internal_server_error("Failed to serialize response data").into_response()
    })
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);
        let data = match serialize(&self.data) {
            Ok(value) => value,
            Err(response) => return response,
        };
        (status, Json(json!({ "success": true, "data": data }))).into_response()
    }
}

/// `{success, count, data}` for unpaged collections.
#[derive(Debug)]
pub struct CollectionResponse<T: Serialize>(pub Vec<T>);

impl<T: Serialize> IntoResponse for CollectionResponse<T> {
    fn into_response(self) -> Response {
        let data = match serialize(&self.0) {
            Ok(value) => value,
            Err(response) => return response,
        };
        Json(json!({ "success": true, "count": self.0.len(), "data": data })).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    pub fn new(query: &ListQuery, total: u64) -> Self {
        let limit = query.limit;
        Self {
            next: (query.page.saturating_mul(limit) < total).then_some(PageLink { page: query.page.saturating_add(1), limit }),
            prev: (query.page > 1).then_some(PageLink { page: query.page - 1, limit }),
        }
    }
}

/// One page of advanced results: `{success, count, pagination, data}`.
#[derive(Debug)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(page: Page<T>, query: &ListQuery) -> Self {
        Self {
            pagination: Pagination::new(query, page.total),
            items: page.items,
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let data = match serialize(&self.items) {
            Ok(value) => value,
            Err(response) => return response,
        };
        Json(json!({
            "success": true,
            "count": self.items.len(),
            "pagination": self.pagination,
            "data": data,
        }))
        .into_response()
    }
}

/// `{success, token}` plus the matching `token` cookie.
#[derive(Debug)]
pub struct TokenResponse {
    token: String,
    cookie: String,
    status: StatusCode,
}

impl TokenResponse {
    pub fn issue(user_id: uuid::Uuid, security: &SecurityConfig) -> Result<Self, ApiError> {
        let token = issue_token(user_id, security)?;
        let max_age = security.cookie_expiry_days * 24 * 60 * 60;
        let cookie = token_cookie(&token, max_age, security.secure_cookies);
        Ok(Self {
            token,
            cookie,
            status: StatusCode::OK,
        })
    }

    pub fn created(mut self) -> Self {
        self.status = StatusCode::CREATED;
        self
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": true, "token": self.token }));
        with_cookie((self.status, body).into_response(), &self.cookie)
    }
}

/// Overwrites the `token` cookie so the browser drops it.
#[derive(Debug)]
pub struct LogoutResponse {
    cookie: String,
}

impl LogoutResponse {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            cookie: token_cookie("logout", 0, security.secure_cookies),
        }
    }
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": true, "data": {} }));
        with_cookie(body.into_response(), &self.cookie)
    }
}

fn token_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!("{}={}; HttpOnly; Path=/; Max-Age={}", TOKEN_COOKIE, value, max_age_secs);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid cookie header: {}", e),
    }
    response
}

// Convenience type aliases
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn query(page: u64, limit: u64) -> ListQuery {
        let mut q = ListQuery::new(&AppConfig::development().api);
        q.page = page;
        q.limit = limit;
        q
    }

    #[test]
    fn pagination_links() {
        let first = Pagination::new(&query(1, 2), 5);
        assert_eq!(first.next, Some(PageLink { page: 2, limit: 2 }));
        assert_eq!(first.prev, None);

        let last = Pagination::new(&query(3, 2), 5);
        assert_eq!(last.next, None);
        assert_eq!(last.prev, Some(PageLink { page: 2, limit: 2 }));

        let exact = Pagination::new(&query(1, 5), 5);
        assert_eq!(exact.next, None);

        let huge = Pagination::new(&query(u64::MAX, 100), 5);
        assert_eq!(huge.next, None);
    }

    #[test]
    fn cookie_flags() {
        assert_eq!(token_cookie("abc", 60, false), "token=abc; HttpOnly; Path=/; Max-Age=60");
        assert!(token_cookie("abc", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn token_response_sets_cookie() {
        let security = AppConfig::development().security;
        let response = TokenResponse::issue(uuid::Uuid::new_v4(), &security).unwrap().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));
    }
}
