//! Shopyard Core Library
//!
//! This crate provides the domain models, error types, configuration,
//! role/permission tables, and subdomain handling shared across all
//! Shopyard components.

pub mod config;
pub mod error;
pub mod models;
pub mod rbac;
pub mod subdomain;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use rbac::{Permission, Role};
