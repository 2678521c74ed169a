//! # mediahub-core
//!
//! Core crate for the MediaHub folder manager. Contains configuration
//! schemas, typed identifiers, domain events, the event sink trait,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other MediaHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
