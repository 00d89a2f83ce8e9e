// handlers/mod.rs - HTTP handlers grouped by resource
//
// Handlers only extract, authenticate and wrap responses. Access decisions and
// writes live in crate::services.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod root;
pub mod users;
