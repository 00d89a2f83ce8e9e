pub mod auth;
pub mod json;
pub mod response;

pub use auth::{Authorized, CurrentUser};
pub use json::{ApiJson, ApiPath, ApiQuery};
pub use response::{
    ApiResponse, ApiResult, CollectionResponse, ListResponse, LogoutResponse, TokenResponse,
};
