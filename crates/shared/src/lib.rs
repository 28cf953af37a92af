//! Vetly Shared Types and Utilities
//!
//! This crate contains types, errors, and utilities shared across the Vetly platform.

pub mod db;
pub mod error;
pub mod types;
pub mod validate;

pub use db::*;
pub use error::*;
pub use types::*;
pub use validate::{validate_slug, validate_tenant_name};
