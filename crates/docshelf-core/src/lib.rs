//! # docshelf-core
//!
//! Core types, traits, and abstractions for the docshelf document service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other docshelf crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;
pub mod upload;

// Re-export commonly used types at crate root
pub use config::{AppConfig, WorkerSettings};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use upload::{sanitize_filename, stored_filename, validate_upload};
