//! # mediahub-entity
//!
//! Domain entity models for the MediaHub folder manager. Every struct in
//! this crate represents a database table row or a domain value object.
//! Database entities derive `sqlx::FromRow`.

pub mod folder;
pub mod permission;
