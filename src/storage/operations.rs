//! Storage operations
//!
//! Filesystem operations behind the directory and file commands. Every
//! function takes already-resolved real paths (see `validation`) and maps
//! failures into `StorageError`; the handlers decide which reply each error
//! becomes.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Lists the contents of a directory; directories get a trailing `/`.
pub fn list_directory(real_path: &Path) -> Result<Vec<String>, StorageError> {
    if !real_path.is_dir() {
        return Err(StorageError::NotADirectory(
            real_path.to_string_lossy().to_string(),
        ));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(real_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() {
            entries.push(format!("{}/", name));
        } else {
            entries.push(name);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Creates a directory; the parent must already exist.
pub fn create_directory(real_path: &Path) -> Result<(), StorageError> {
    if real_path.exists() {
        return Err(StorageError::FileAlreadyExists(
            real_path.to_string_lossy().to_string(),
        ));
    }
    fs::create_dir(real_path)?;
    info!("Created directory {}", real_path.display());
    Ok(())
}

/// Removes an empty directory.
pub fn remove_directory(real_path: &Path) -> Result<(), StorageError> {
    if !real_path.exists() {
        return Err(StorageError::DirectoryNotFound(
            real_path.to_string_lossy().to_string(),
        ));
    }
    if !real_path.is_dir() {
        return Err(StorageError::NotADirectory(
            real_path.to_string_lossy().to_string(),
        ));
    }
    fs::remove_dir(real_path)?;
    info!("Removed directory {}", real_path.display());
    Ok(())
}

/// Deletes a regular file.
pub fn delete_file(real_path: &Path) -> Result<(), StorageError> {
    if !real_path.exists() {
        return Err(StorageError::FileNotFound(
            real_path.to_string_lossy().to_string(),
        ));
    }
    if !real_path.is_file() {
        return Err(StorageError::NotAFile(
            real_path.to_string_lossy().to_string(),
        ));
    }
    fs::remove_file(real_path)?;
    info!("Deleted file {}", real_path.display());
    Ok(())
}

/// Renames a file or directory. The source must exist; the destination must
/// not.
pub fn rename_entry(source: &Path, destination: &Path) -> Result<(), StorageError> {
    if !source.exists() {
        return Err(StorageError::FileNotFound(
            source.to_string_lossy().to_string(),
        ));
    }
    if destination.exists() {
        return Err(StorageError::FileAlreadyExists(
            destination.to_string_lossy().to_string(),
        ));
    }
    fs::rename(source, destination)?;
    info!(
        "Renamed {} -> {}",
        source.display(),
        destination.display()
    );
    Ok(())
}

/// Picks a name not yet present next to `real_path` by appending a numeric
/// suffix, for STOU.
pub fn unique_name(real_path: &Path) -> Result<PathBuf, StorageError> {
    if !real_path.exists() {
        return Ok(real_path.to_path_buf());
    }

    let base = real_path.to_string_lossy().to_string();
    for n in 1..1000u32 {
        let candidate = PathBuf::from(format!("{}.{}", base, n));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(StorageError::FileAlreadyExists(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_directory_marks_directories() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("sub")).unwrap();
        fs::write(root.path().join("a.txt"), b"x").unwrap();

        let entries = list_directory(root.path()).unwrap();
        assert_eq!(entries, vec!["a.txt".to_string(), "sub/".to_string()]);
    }

    #[test]
    fn test_create_and_remove_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("d");

        create_directory(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(matches!(
            create_directory(&dir),
            Err(StorageError::FileAlreadyExists(_))
        ));

        remove_directory(&dir).unwrap();
        assert!(!dir.exists());
        assert!(matches!(
            remove_directory(&dir),
            Err(StorageError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_delete_file_refuses_directories() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("d");
        fs::create_dir(&dir).unwrap();
        assert!(matches!(
            delete_file(&dir),
            Err(StorageError::NotAFile(_))
        ));
    }

    #[test]
    fn test_rename_entry() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("a.txt");
        let dst = root.path().join("b.txt");
        fs::write(&src, b"x").unwrap();

        rename_entry(&src, &dst).unwrap();
        assert!(!src.exists());
        assert!(dst.exists());

        assert!(matches!(
            rename_entry(&src, &dst),
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_unique_name_appends_suffix() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("up.txt");
        assert_eq!(unique_name(&path).unwrap(), path);

        fs::write(&path, b"x").unwrap();
        let next = unique_name(&path).unwrap();
        assert_eq!(next, root.path().join("up.txt.1"));
    }
}
