pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod services;
pub mod store;

pub use context::AppContext;
pub use routes::app;
