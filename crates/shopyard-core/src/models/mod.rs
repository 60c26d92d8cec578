//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain. Each sub-module represents a specific feature area.

mod billing;
mod invitation;
mod membership;
mod plan;
mod tenant;
mod user;

// Re-export all models for convenient imports
pub use billing::*;
pub use invitation::*;
pub use membership::*;
pub use plan::*;
pub use tenant::*;
pub use user::*;
