//! Timestamp-ordered concatenation of per-session CSV exports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{error, info};
use thiserror::Error;

use crate::config::CombineConfig;
use crate::core::loaders::{
    entry_name, list_files_with_suffix, list_subdirectories, load_csv_table,
    parse_filename_timestamp, CsvTable, LoaderError,
};
use crate::core::writers::{write_csv_table, write_xlsx_table, WriteError};

/// Errors that can occur while combining CSV files.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No CSV files found in {folder}")]
    NoFilesFound { folder: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bad timestamp in {path}: {source}")]
    Timestamp {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    #[error("Empty CSV file: {path}")]
    EmptyCsv { path: PathBuf },

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result type for combine operations.
pub type Result<T> = std::result::Result<T, CombineError>;

/// Outputs written for one input folder.
#[derive(Debug, Clone)]
pub struct CombinedOutput {
    pub input_folder: PathBuf,
    pub output_csv: PathBuf,
    pub output_excel: Option<PathBuf>,
    /// Input files in concatenation order.
    pub files: Vec<PathBuf>,
    pub rows: usize,
}

/// Outcome of combining every converted folder under a base folder.
#[derive(Debug, Default)]
pub struct CombineSummary {
    pub combined: Vec<CombinedOutput>,
    pub failed: Vec<(PathBuf, CombineError)>,
}

/// List the CSV files of `input_folder` ordered by filename timestamp.
///
/// Files with equal timestamps keep filename order.
///
/// # Errors
///
/// Fails if the folder has no `.csv` files or any file lacks a timestamp
/// matching `config.timestamp_format`.
pub fn sorted_csv_files(input_folder: &Path, config: &CombineConfig) -> Result<Vec<PathBuf>> {
    if !input_folder.is_dir() {
        return Err(CombineError::DirectoryNotFound(input_folder.to_path_buf()));
    }

    let files = list_files_with_suffix(input_folder, ".csv").map_err(|e| CombineError::Io {
        path: input_folder.to_path_buf(),
        source: e,
    })?;

    if files.is_empty() {
        return Err(CombineError::NoFilesFound {
            folder: input_folder.to_path_buf(),
        });
    }

    let mut keyed: Vec<(NaiveDateTime, PathBuf)> = Vec::with_capacity(files.len());
    for path in files {
        let ts = parse_filename_timestamp(&path, &config.timestamp_format).map_err(|e| {
            CombineError::Timestamp {
                path: path.clone(),
                source: e,
            }
        })?;
        keyed.push((ts, path));
    }

    // Stable sort keeps filename order for equal timestamps
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

/// Concatenate tables row-wise.
///
/// Output columns are the union of all headers in order of first
/// appearance; cells for columns a table lacks are left empty. Header
/// names within one table must be unique, as [`load_csv_table`] ensures.
pub fn concat_tables(tables: &[CsvTable]) -> CsvTable {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for table in tables {
        for header in &table.headers {
            if !positions.contains_key(header) {
                positions.insert(header.clone(), headers.len());
                headers.push(header.clone());
            }
        }
    }

    let total_rows: usize = tables.iter().map(CsvTable::len).sum();
    let mut rows = Vec::with_capacity(total_rows);

    for table in tables {
        let mapping: Vec<usize> = table.headers.iter().map(|h| positions[h]).collect();

        for row in &table.rows {
            let mut out = vec![String::new(); headers.len()];
            for (cell, &col) in row.iter().zip(&mapping) {
                out[col] = cell.clone();
            }
            rows.push(out);
        }
    }

    CsvTable { headers, rows }
}

fn load_sorted_tables(input_folder: &Path, config: &CombineConfig) -> Result<(Vec<PathBuf>, CsvTable)> {
    let files = sorted_csv_files(input_folder, config)?;

    let mut tables = Vec::with_capacity(files.len());
    for path in &files {
        let table = load_csv_table(path).map_err(|e| match e {
            LoaderError::EmptyFile(empty) => CombineError::EmptyCsv { path: empty },
            other => CombineError::Load {
                path: path.clone(),
                source: other,
            },
        })?;
        tables.push(table);
    }

    Ok((files, concat_tables(&tables)))
}

/// Combine the CSV files of `input_folder` into `output_csv`.
///
/// # Arguments
///
/// * `input_folder` - Folder of per-session CSV exports
/// * `output_csv` - Combined CSV path (parent directories will be created)
/// * `config` - Timestamp format for ordering
pub fn combine_csv_files(
    input_folder: &Path,
    output_csv: &Path,
    config: &CombineConfig,
) -> Result<CombinedOutput> {
    let (files, combined) = load_sorted_tables(input_folder, config)?;
    write_csv_table(output_csv, &combined)?;

    info!(
        "Combined {} files ({} rows) to {}",
        files.len(),
        combined.len(),
        output_csv.display()
    );

    Ok(CombinedOutput {
        input_folder: input_folder.to_path_buf(),
        output_csv: output_csv.to_path_buf(),
        output_excel: None,
        files,
        rows: combined.len(),
    })
}

/// Combine the CSV files of `input_folder` into both a CSV and an XLSX file.
pub fn combine_folder_with_excel(
    input_folder: &Path,
    output_csv: &Path,
    output_excel: &Path,
    config: &CombineConfig,
) -> Result<CombinedOutput> {
    let (files, combined) = load_sorted_tables(input_folder, config)?;
    write_csv_table(output_csv, &combined)?;
    info!("Combined CSV saved to {}", output_csv.display());

    write_xlsx_table(output_excel, &combined)?;
    info!("Combined Excel saved to {}", output_excel.display());

    Ok(CombinedOutput {
        input_folder: input_folder.to_path_buf(),
        output_csv: output_csv.to_path_buf(),
        output_excel: Some(output_excel.to_path_buf()),
        files,
        rows: combined.len(),
    })
}

/// Subject name for a converted folder, or `None` if the name lacks the suffix.
pub fn converted_subject<'a>(folder_name: &'a str, config: &CombineConfig) -> Option<&'a str> {
    folder_name
        .strip_suffix(config.converted_suffix.as_str())
        .filter(|subject| !subject.is_empty())
}

/// Combine every `<subject><suffix>` folder under `base_folder`.
///
/// Writes `<base>/<prefix><subject>.csv` and
/// `<base>/<prefix><subject>-<base name>.xlsx` per subject. A folder that
/// fails is logged and recorded in the summary; the others still run.
///
/// # Errors
///
/// Only fails if `base_folder` itself cannot be listed.
pub fn combine_all_subjects(base_folder: &Path, config: &CombineConfig) -> Result<CombineSummary> {
    if !base_folder.is_dir() {
        return Err(CombineError::DirectoryNotFound(base_folder.to_path_buf()));
    }

    let base_name = entry_name(base_folder);
    let folders = list_subdirectories(base_folder).map_err(|e| CombineError::Io {
        path: base_folder.to_path_buf(),
        source: e,
    })?;

    let mut summary = CombineSummary::default();

    for folder in folders {
        let folder_name = entry_name(&folder);
        let subject = match converted_subject(&folder_name, config) {
            Some(s) => s,
            None => continue,
        };

        let output_csv = base_folder.join(format!("{}{}.csv", config.output_prefix, subject));
        let output_excel = base_folder.join(format!(
            "{}{}-{}.xlsx",
            config.output_prefix, subject, base_name
        ));

        info!("Processing folder: {}", folder_name);

        match combine_folder_with_excel(&folder, &output_csv, &output_excel, config) {
            Ok(output) => summary.combined.push(output),
            Err(e) => {
                error!("Failed to combine {}: {}", folder.display(), e);
                summary.failed.push((folder, e));
            }
        }
    }

    Ok(summary)
}
