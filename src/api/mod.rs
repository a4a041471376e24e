//! Typed client for the flight admin HTTP API.

mod auth;
mod client;
mod dictionaries;
pub mod error;
mod flights;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, ApiErrorKind};
