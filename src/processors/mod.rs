//! Data processing modules.

pub mod combining;
pub mod listing;
pub mod quarantine;

// Re-export key types for convenience
pub use combining::{
    combine_all_subjects, combine_csv_files, combine_folder_with_excel, concat_tables,
    sorted_csv_files, CombineError, CombineSummary, CombinedOutput,
};
pub use listing::{list_subfolder_names, save_subfolder_names, ListingError};
pub use quarantine::{
    check_parent, check_subject, evaluate_session, move_session, ScanError, ScanSummary,
    SessionCheck, SubjectReport,
};
