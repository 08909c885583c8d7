//! # hookgate-core
//!
//! Core crate for Hookgate. Contains the configuration schemas loaded at
//! startup and the unified error type that every other crate maps into at
//! the host boundary.
//!
//! This crate has **no** internal dependencies on other Hookgate crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
