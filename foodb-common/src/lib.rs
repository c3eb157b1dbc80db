//! # foodb Common Library
//!
//! Shared code for the foodb build steps including:
//! - Database open and schema creation
//! - Data models for the canonical nutrition layer
//! - Configuration resolution
//! - Error types

pub mod config;
pub mod db;
pub mod error;

pub use config::PipelineConfig;
pub use error::{Error, Result};
