//! Storage system
//!
//! Filesystem collaborators for the command handlers: virtual path
//! resolution and validation, and directory/file operations.

pub mod operations;
pub mod validation;

pub use operations::{
    create_directory, delete_file, list_directory, remove_directory, rename_entry, unique_name,
};
pub use validation::{resolve_path, resolve_virtual_path, virtual_to_real};
