//! Materialized path helpers.
//!
//! A folder path is the chain of folder ids from the top-level folder down
//! to the folder itself, each prefixed with `/`: `/<root>/<child>/<self>`.

use mediahub_core::AppError;
use mediahub_core::types::FolderId;

/// Path of a root folder.
pub fn root_path(id: FolderId) -> String {
    format!("/{id}")
}

/// Path of a folder placed under a parent with `parent_path`.
pub fn child_path(parent_path: &str, id: FolderId) -> String {
    format!("{parent_path}/{id}")
}

/// Split a path into its folder ids, root first.
pub fn parse_path(path: &str) -> Result<Vec<FolderId>, AppError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(AppError::structural_integrity(format!(
            "Folder path '{path}' does not start with '/'"
        )));
    };
    rest.split('/')
        .map(|segment| {
            segment.parse::<FolderId>().map_err(|_| {
                AppError::structural_integrity(format!(
                    "Folder path '{path}' has invalid segment '{segment}'"
                ))
            })
        })
        .collect()
}

/// Whether `path` equals `ancestor` or lies below it.
///
/// Compares whole segments, so `/a/b` is not within `/a/bc`.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Replace the `old_prefix` of `path` with `new_prefix`.
///
/// Returns `None` if `path` is not within `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(path, old_prefix) {
        return None;
    }
    Some(format!("{new_prefix}{}", &path[old_prefix.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let a = FolderId::from_u128(1);
        let b = FolderId::from_u128(4);
        let c = FolderId::from_u128(9);
        let path = child_path(&child_path(&root_path(a), b), c);
        assert_eq!(parse_path(&path).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_path("no-slash").is_err());
        assert!(parse_path("/not-a-uuid").is_err());
        assert!(parse_path("/").is_err());
    }

    #[test]
    fn test_is_within_matches_whole_segments() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert!(!is_within("/a", "/a/b"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("/a/b/c", "/a/b", "/x/y/b").as_deref(), Some("/x/y/b/c"));
        assert_eq!(rebase("/a/b", "/a/b", "/b").as_deref(), Some("/b"));
        assert_eq!(rebase("/z", "/a", "/b"), None);
    }
}
