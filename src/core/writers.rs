//! Data writers for text logs, CSV, and Excel outputs.
//!
//! This module provides functions for writing pipeline outputs:
//! - Plain text, one line per item (subfolder listings)
//! - CSV tables with a header row
//! - XLSX workbooks with a single worksheet

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;

use super::loaders::CsvTable;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Excel writing error.
    #[error("Excel write error for '{path}': {source}")]
    XlsxError {
        path: String,
        #[source]
        source: XlsxError,
    },

    /// Table is wider than a worksheet allows.
    #[error("table has {columns} columns, too many for worksheet '{path}'")]
    ColumnLimit { path: String, columns: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path, truncating any existing file.
pub(crate) fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write each item on its own newline-terminated line.
///
/// Parent directories are created if needed and an existing file is
/// overwritten.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let path_str = path.display().to_string();

    for line in lines {
        writeln!(writer, "{}", line.as_ref()).map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write a table to CSV with its header row.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `table` - Headers and rows to write
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
pub fn write_csv_table(path: &Path, table: &CsvTable) -> Result<()> {
    ensure_parent_dirs(path)?;

    let buf_writer = create_buffered_writer(path)?;
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();

    csv_writer
        .write_record(&table.headers)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for row in &table.rows {
        csv_writer.write_record(row).map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write a table to a single-sheet XLSX workbook.
///
/// Row 0 holds the headers. Cells that parse as a finite number are
/// written as numbers, everything else as text. Empty cells are left blank.
///
/// # Example
///
/// ```no_run
/// use storybook_pipeline::core::loaders::CsvTable;
/// use storybook_pipeline::core::writers::write_xlsx_table;
/// use std::path::Path;
///
/// let table = CsvTable {
///     headers: vec!["time".into(), "event".into()],
///     rows: vec![vec!["1.5".into(), "page_turn".into()]],
/// };
/// write_xlsx_table(Path::new("combined.xlsx"), &table).unwrap();
/// ```
pub fn write_xlsx_table(path: &Path, table: &CsvTable) -> Result<()> {
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let xlsx_err = |e: XlsxError| WriteError::XlsxError {
        path: path_str.clone(),
        source: e,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in table.headers.iter().enumerate() {
        let col = column_index(col, table.headers.len(), &path_str)?;
        worksheet
            .write_string(0, col, header.as_str())
            .map_err(xlsx_err)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row =
            u32::try_from(row_idx + 1).map_err(|_| xlsx_err(XlsxError::RowColumnLimitError))?;

        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let col = column_index(col, row.len(), &path_str)?;

            match cell.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => {
                    worksheet
                        .write_number(excel_row, col, number)
                        .map_err(xlsx_err)?;
                }
                _ => {
                    worksheet
                        .write_string(excel_row, col, cell.as_str())
                        .map_err(xlsx_err)?;
                }
            }
        }
    }

    workbook.save(path).map_err(xlsx_err)?;

    Ok(())
}

fn column_index(col: usize, columns: usize, path: &str) -> Result<u16> {
    u16::try_from(col).map_err(|_| WriteError::ColumnLimit {
        path: path.to_string(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_table() -> CsvTable {
        CsvTable {
            headers: vec!["time".to_string(), "event".to_string()],
            rows: vec![
                vec!["1.5".to_string(), "start".to_string()],
                vec!["2".to_string(), "page, turn".to_string()],
                vec!["".to_string(), "end".to_string()],
            ],
        }
    }

    #[test]
    fn test_write_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.txt");

        write_lines(&path, &["c001", "c002"]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "c001\nc002\n");
    }

    #[test]
    fn test_write_lines_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdir").join("nested").join("names.txt");

        write_lines::<&str>(&path, &[]).unwrap();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_csv_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.csv");

        write_csv_table(&path, &create_test_table()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "time,event");
        assert_eq!(lines[1], "1.5,start");
        assert_eq!(lines[2], "2,\"page, turn\"");
        assert_eq!(lines[3], ",end");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_write_csv_table_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        fs::write(&path, "stale,data\n1,2\n3,4\n5,6\n").unwrap();

        let table = CsvTable {
            headers: vec!["a".to_string()],
            rows: vec![],
        };
        write_csv_table(&path, &table).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn test_write_xlsx_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("combined.xlsx");

        write_xlsx_table(&path, &create_test_table()).unwrap();

        // XLSX is a zip container
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }
}
