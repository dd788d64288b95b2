pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod state;
pub mod store;
