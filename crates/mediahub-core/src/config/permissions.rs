//! Permission resolution policy.

use serde::{Deserialize, Serialize};

/// How grants on ancestor folders affect a descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    /// Each folder's grant list is authoritative for that folder only.
    #[default]
    None,
    /// The highest live grant on the folder or any ancestor applies.
    Ancestors,
}

/// Permission configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Inheritance mode used by access checks.
    #[serde(default)]
    pub inheritance: InheritanceMode,
}
