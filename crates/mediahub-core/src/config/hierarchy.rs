//! Folder hierarchy limits.

use serde::{Deserialize, Serialize};

/// Shape and naming rules enforced on the folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Deepest allowed folder depth (roots are depth 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: i32,
    /// Maximum folder name length in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Compare sibling names case-insensitively.
    #[serde(default = "default_true")]
    pub case_insensitive_names: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_name_length: default_max_name_length(),
            case_insensitive_names: true,
        }
    }
}

impl HierarchyConfig {
    /// Normalize a folder name into the key used for sibling comparison.
    pub fn name_key(&self, name: &str) -> String {
        let trimmed = name.trim();
        if self.case_insensitive_names {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

fn default_max_depth() -> i32 {
    32
}

fn default_max_name_length() -> usize {
    255
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_respects_case_setting() {
        let mut config = HierarchyConfig::default();
        assert_eq!(config.name_key("  Holiday Photos "), "holiday photos");
        config.case_insensitive_names = false;
        assert_eq!(config.name_key("Holiday Photos"), "Holiday Photos");
    }
}
