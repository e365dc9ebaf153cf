//! Omnicanal API Library
//!
//! This crate contains the API server components for the Omnicanal support backend.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::serve;
pub use state::AppState;
