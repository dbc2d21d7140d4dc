//! # API Shared
//!
//! Shared utilities and definitions for PRS APIs.
//!
//! Contains:
//! - Wire types (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `api-rest` and `prs-cli` for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError};
pub use dto::*;
pub use health::HealthService;
