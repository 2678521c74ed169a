//! # mediahub-auth
//!
//! Folder-level authorization for the MediaHub folder manager.
//!
//! ## Modules
//!
//! - `acl`: grant lookup and the effective permission resolver consulted
//!   before every mutation

pub mod acl;

pub use acl::{AccessSource, AclChecker, AclInheritanceResolver, EffectiveAccess, PermissionResolver};
