//! Data loaders for session folders and CSV exports.
//!
//! This module provides the read side of the pipeline:
//! - Emptiness checks for the per-session CSV exports
//! - Sorted directory snapshots
//! - Header-aware CSV table loading for concatenation
//! - Timestamps embedded in export filenames

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("No timestamp matching '{format}' in file name: {name}")]
    InvalidTimestamp { name: String, format: String },

    #[error("Row at line {line} of {} has more fields than the header", path.display())]
    RaggedRow { path: PathBuf, line: u64 },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Presence and content state of an expected export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Exists and has at least one non-whitespace character.
    Present,
    /// Exists but is empty or whitespace only.
    Empty,
    /// Not a regular file at the expected path.
    Missing,
}

/// Check whether an expected export file is present, empty, or missing.
///
/// The whole file is read; only trimmed content length matters. A header
/// row with no data rows counts as present.
///
/// # Errors
///
/// Returns the underlying IO error if the file exists but cannot be read
/// or is not valid UTF-8.
pub fn file_status(path: &Path) -> std::io::Result<FileStatus> {
    if !path.is_file() {
        return Ok(FileStatus::Missing);
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        Ok(FileStatus::Empty)
    } else {
        Ok(FileStatus::Present)
    }
}

/// Snapshot the directories directly under `dir`, sorted by path.
///
/// The listing is taken once; directories created afterwards are not
/// included.
pub fn list_subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Snapshot the files directly under `dir` whose name ends with `suffix`.
///
/// Matching is exact and case-sensitive. Results are sorted by path.
pub fn list_files_with_suffix(dir: &Path, suffix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && entry_name(&path).ends_with(suffix) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Final path component as a `String`.
///
/// Falls back to the canonical path's name for inputs such as `.`, and to
/// an empty string for filesystem roots.
pub fn entry_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }

    fs::canonicalize(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// Parse the timestamp embedded in an export filename.
///
/// The timestamp is the second `_`-separated field of the file name with
/// `.csv` removed, e.g. `storybook_2024-03-01-09-15-00.csv`. Formats
/// without a time component are accepted and resolve to midnight.
pub fn parse_filename_timestamp(path: &Path, format: &str) -> Result<NaiveDateTime> {
    let name = entry_name(path);
    let invalid = || LoaderError::InvalidTimestamp {
        name: name.clone(),
        format: format.to_string(),
    };

    let field = name.split('_').nth(1).ok_or_else(invalid)?;
    let stamp = field.replace(".csv", "");

    if let Ok(ts) = NaiveDateTime::parse_from_str(&stamp, format) {
        return Ok(ts);
    }

    NaiveDate::parse_from_str(&stamp, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)
}

/// An in-memory CSV table: one header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Data rows, each padded to `headers.len()`.
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Returns the number of data rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load a CSV file with a header row into a [`CsvTable`].
///
/// Repeated header names are made unique with a numeric suffix, so
/// `a,a,a` loads as `a`, `a.1`, `a.2`. Short rows are padded with empty
/// cells.
///
/// # Errors
///
/// Returns [`LoaderError::EmptyFile`] if the file has no header row,
/// [`LoaderError::RaggedRow`] if a row has more cells than the header, or
/// an IO/CSV error if it cannot be read.
pub fn load_csv_table<P: AsRef<Path>>(path: P) -> Result<CsvTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    let headers = dedup_headers(headers);

    let width = headers.len();
    let mut rows = Vec::with_capacity(256);

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > width {
            let line = record.position().map_or(idx as u64 + 2, |p| p.line());
            return Err(LoaderError::RaggedRow {
                path: path.to_path_buf(),
                line,
            });
        }

        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(CsvTable { headers, rows })
}

/// Rename repeated headers to `name.1`, `name.2`, ... in file order.
///
/// A generated name that collides with an existing header is suffixed
/// again, e.g. `a,a.1,a` becomes `a`, `a.1`, `a.1.1`.
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(headers.len());

    headers
        .into_iter()
        .map(|header| {
            let mut name = header;
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{name}.{count}");
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), 1);
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_file_status_missing() {
        let temp_dir = TempDir::new().unwrap();
        let status = file_status(&temp_dir.path().join("nope.csv")).unwrap();
        assert_eq!(status, FileStatus::Missing);
    }

    #[test]
    fn test_file_status_directory_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("storybook_event.csv")).unwrap();

        let status = file_status(&temp_dir.path().join("storybook_event.csv")).unwrap();
        assert_eq!(status, FileStatus::Missing);
    }

    #[test]
    fn test_file_status_empty_and_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let empty = write_file(temp_dir.path(), "empty.csv", "");
        let blank = write_file(temp_dir.path(), "blank.csv", "   \n\n");

        assert_eq!(file_status(&empty).unwrap(), FileStatus::Empty);
        assert_eq!(file_status(&blank).unwrap(), FileStatus::Empty);
    }

    #[test]
    fn test_file_status_header_only_is_present() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "header.csv", "col1,col2\n");

        assert_eq!(file_status(&path).unwrap(), FileStatus::Present);
    }

    #[test]
    fn test_file_status_invalid_utf8_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("binary.csv");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        assert!(file_status(&path).is_err());
    }

    #[test]
    fn test_list_subdirectories_sorted_dirs_only() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        write_file(temp_dir.path(), "c.txt", "x");

        let dirs = list_subdirectories(temp_dir.path()).unwrap();
        let names: Vec<String> = dirs.iter().map(|p| entry_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_list_files_with_suffix_is_case_sensitive() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "a.csv", "x");
        write_file(temp_dir.path(), "b.CSV", "x");
        write_file(temp_dir.path(), "c.txt", "x");

        let files = list_files_with_suffix(temp_dir.path(), ".csv").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(entry_name(&files[0]), "a.csv");
    }

    #[test]
    fn test_entry_name_of_current_dir() {
        let name = entry_name(Path::new("."));
        assert!(!name.is_empty());
    }

    #[test]
    fn test_parse_filename_timestamp() {
        let ts = parse_filename_timestamp(
            Path::new("dir/storybook_2024-03-01-09-15-30.csv"),
            "%Y-%m-%d-%H-%M-%S",
        )
        .unwrap();

        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.second(), 30);
    }

    #[test]
    fn test_parse_filename_timestamp_date_only_format() {
        let ts = parse_filename_timestamp(Path::new("session_2024-03-01.csv"), "%Y-%m-%d").unwrap();
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_parse_filename_timestamp_errors() {
        let no_field = parse_filename_timestamp(Path::new("nounderscore.csv"), "%Y-%m-%d-%H-%M-%S");
        assert!(matches!(no_field, Err(LoaderError::InvalidTimestamp { .. })));

        let bad = parse_filename_timestamp(Path::new("a_notadate.csv"), "%Y-%m-%d-%H-%M-%S");
        assert!(matches!(bad, Err(LoaderError::InvalidTimestamp { .. })));
    }

    #[test]
    fn test_load_csv_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "t.csv", "a,b\n1,2\n3\n");

        let table = load_csv_table(&path).unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["1", "2"]);
        assert_eq!(table.rows[1], vec!["3", ""]);
    }

    #[test]
    fn test_load_csv_table_long_row_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "t.csv", "a,b\n1,2\n4,5,6\n");

        match load_csv_table(&path) {
            Err(LoaderError::RaggedRow { path: err_path, line }) => {
                assert_eq!(err_path, path);
                assert_eq!(line, 3);
            }
            other => panic!("expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_load_csv_table_renames_repeated_headers() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "d.csv", "a,a\n1,2\n");

        let table = load_csv_table(&path).unwrap();
        assert_eq!(table.headers, vec!["a", "a.1"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_dedup_headers_skips_existing_names() {
        let headers = ["a", "a.1", "a", "b", "a"].map(String::from).to_vec();
        assert_eq!(dedup_headers(headers), vec!["a", "a.1", "a.1.1", "b", "a.2"]);
    }

    #[test]
    fn test_load_csv_table_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "h.csv", "a,b\n");

        let table = load_csv_table(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers.len(), 2);
    }

    #[test]
    fn test_load_csv_table_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(temp_dir.path(), "e.csv", "");

        let result = load_csv_table(&path);
        assert!(matches!(result, Err(LoaderError::EmptyFile(_))));
    }
}
