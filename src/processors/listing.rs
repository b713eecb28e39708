//! Subfolder name listing for subject folders.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::core::loaders::{entry_name, list_subdirectories};
use crate::core::writers::{write_lines, WriteError};

/// Errors that can occur while listing subfolders.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Names of the directories directly under `folder`, sorted.
pub fn list_subfolder_names(folder: &Path) -> Result<Vec<String>, ListingError> {
    if !folder.is_dir() {
        return Err(ListingError::DirectoryNotFound(folder.to_path_buf()));
    }

    let dirs = list_subdirectories(folder).map_err(|e| ListingError::Io {
        path: folder.to_path_buf(),
        source: e,
    })?;

    Ok(dirs.iter().map(|d| entry_name(d)).collect())
}

/// Write the subfolder names of `folder` to `output_file`, one per line.
///
/// # Returns
///
/// The names written, in file order.
pub fn save_subfolder_names(folder: &Path, output_file: &Path) -> Result<Vec<String>, ListingError> {
    let names = list_subfolder_names(folder)?;
    write_lines(output_file, &names)?;

    info!(
        "Saved {} subfolder names from {} to {}",
        names.len(),
        folder.display(),
        output_file.display()
    );

    Ok(names)
}
