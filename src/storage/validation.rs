//! Path validation
//!
//! Sessions see a virtual filesystem rooted at the configured server root:
//! every client-visible path is a normalized absolute path like `/alice/in`,
//! mapped onto `<server_root>/alice/in` on disk. Normalization happens here,
//! before any filesystem access, and refuses to climb above the virtual root.

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Resolve a client-supplied target against the current virtual directory
/// into a normalized virtual absolute path.
///
/// `.` and empty segments are dropped, `..` pops one segment; popping past
/// the virtual root is a traversal attempt and is rejected.
pub fn resolve_virtual_path(cwd: &str, target: &str) -> Result<String, StorageError> {
    if target.is_empty() {
        return Err(StorageError::InvalidPath("Empty path provided".into()));
    }

    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::PathTraversal(target.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}

/// Map a normalized virtual path onto the real filesystem.
pub fn virtual_to_real(server_root: &Path, virtual_path: &str) -> PathBuf {
    let relative = virtual_path.trim_start_matches('/');
    if relative.is_empty() {
        server_root.to_path_buf()
    } else {
        server_root.join(relative)
    }
}

/// Resolve a target to both its virtual and real form in one step.
pub fn resolve_path(
    server_root: &Path,
    cwd: &str,
    target: &str,
) -> Result<(String, PathBuf), StorageError> {
    let virtual_path = resolve_virtual_path(cwd, target)?;
    let real_path = virtual_to_real(server_root, &virtual_path);
    Ok((virtual_path, real_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        assert_eq!(resolve_virtual_path("/alice", "docs").unwrap(), "/alice/docs");
        assert_eq!(resolve_virtual_path("/", "docs").unwrap(), "/docs");
    }

    #[test]
    fn test_absolute_paths_ignore_cwd() {
        assert_eq!(resolve_virtual_path("/alice", "/bob").unwrap(), "/bob");
    }

    #[test]
    fn test_dot_and_empty_segments_are_dropped() {
        assert_eq!(
            resolve_virtual_path("/alice", "./docs//x/.").unwrap(),
            "/alice/docs/x"
        );
    }

    #[test]
    fn test_parent_segments_pop() {
        assert_eq!(resolve_virtual_path("/alice/docs", "..").unwrap(), "/alice");
        assert_eq!(resolve_virtual_path("/alice", "../bob").unwrap(), "/bob");
    }

    #[test]
    fn test_escaping_the_root_is_rejected() {
        assert!(matches!(
            resolve_virtual_path("/", ".."),
            Err(StorageError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_virtual_path("/alice", "../../etc/passwd"),
            Err(StorageError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_empty_target_is_invalid() {
        assert!(matches!(
            resolve_virtual_path("/", ""),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_virtual_to_real_mapping() {
        let root = Path::new("/srv/ftp");
        assert_eq!(virtual_to_real(root, "/"), PathBuf::from("/srv/ftp"));
        assert_eq!(
            virtual_to_real(root, "/alice/a.txt"),
            PathBuf::from("/srv/ftp/alice/a.txt")
        );
    }
}
