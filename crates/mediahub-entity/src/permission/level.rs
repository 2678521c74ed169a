//! Permission level enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use mediahub_core::AppError;

/// Permission level for a folder grant.
///
/// Totally ordered by privilege: `View < Upload < Edit < Delete < Admin`.
/// A higher level implies every capability of the lower ones, so "has at
/// least `L`" is plain `level >= L`. Variant order is significant: both
/// the derived `Ord` and the PostgreSQL enum rely on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "permission_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Browse the folder and its files.
    View,
    /// Add files.
    Upload,
    /// Rename, recolor, move, and create subfolders.
    Edit,
    /// Delete the folder and its files.
    Delete,
    /// Manage grants and visibility.
    Admin,
}

impl PermissionLevel {
    /// Every level, lowest first.
    pub const ALL: [PermissionLevel; 5] = [
        Self::View,
        Self::Upload,
        Self::Edit,
        Self::Delete,
        Self::Admin,
    ];

    /// Check if this level grants at least `required`.
    pub fn has_at_least(&self, required: PermissionLevel) -> bool {
        *self >= required
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Upload => "upload",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "upload" => Ok(Self::Upload),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::validation(format!(
                "Invalid permission level: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_totally_ordered() {
        for pair in PermissionLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(PermissionLevel::Admin.has_at_least(PermissionLevel::Delete));
        assert!(!PermissionLevel::Upload.has_at_least(PermissionLevel::Edit));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "DELETE".parse::<PermissionLevel>().unwrap(),
            PermissionLevel::Delete
        );
        assert!("owner".parse::<PermissionLevel>().is_err());
    }
}
