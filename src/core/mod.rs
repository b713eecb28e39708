//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{CsvTable, FileStatus, LoaderError};
pub use writers::{write_csv_table, write_lines, write_xlsx_table, WriteError};
