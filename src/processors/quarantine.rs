//! Quarantine of session folders with missing or empty CSV exports.
//!
//! Layout consumed and produced:
//!
//! ```text
//! <parent>/
//! ├── c001/
//! │   └── s1/{storybook_command.csv, storybook_event.csv}   # valid, stays
//! ├── empty-c001/
//! │   ├── s2/...                                            # moved here
//! │   └── empty-c001.txt                                    # subject log
//! └── empty-<parent>.txt                                    # global log
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::QuarantineConfig;
use crate::core::loaders::{entry_name, file_status, list_subdirectories, FileStatus};
use crate::core::writers::{create_buffered_writer, WriteError};

/// Width of the `=` rule lines in the global log.
const RULE_WIDTH: usize = 50;

/// Errors that can occur during a quarantine scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid folder path: {0}")]
    InvalidPath(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot quarantine {from}: {to} already exists")]
    DestinationExists { from: PathBuf, to: PathBuf },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ScanError + '_ {
    move |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Evaluation of one session folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCheck {
    /// Folder name of the session.
    pub name: String,
    /// Location of the session when it was evaluated.
    pub path: PathBuf,
    /// One entry per missing or empty export, command file first.
    pub reasons: Vec<String>,
}

impl SessionCheck {
    /// True if at least one export is missing or empty.
    #[inline]
    pub fn is_quarantinable(&self) -> bool {
        !self.reasons.is_empty()
    }

    /// Log line for this session, without the trailing newline.
    pub fn log_line(&self) -> String {
        format!("- {}: {}", self.name, self.reasons.join(", "))
    }
}

/// Outcome of scanning one subject folder.
#[derive(Debug, Clone)]
pub struct SubjectReport {
    pub subject: String,
    pub quarantine_dir: PathBuf,
    pub log_path: PathBuf,
    /// Sessions moved (or, in a dry run, that would be moved).
    pub quarantined: Vec<SessionCheck>,
    /// Session folders left directly under the subject folder.
    pub remaining: usize,
}

/// Outcome of scanning a whole parent folder.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub global_log_path: PathBuf,
    pub subjects: Vec<SubjectReport>,
    pub total_remaining: usize,
    pub dry_run: bool,
}

impl ScanSummary {
    /// Number of sessions quarantined across all subjects.
    pub fn total_quarantined(&self) -> usize {
        self.subjects.iter().map(|s| s.quarantined.len()).sum()
    }
}

fn file_reason(status: FileStatus, filename: &str) -> Option<String> {
    match status {
        FileStatus::Present => None,
        FileStatus::Empty => Some(filename.to_string()),
        FileStatus::Missing => Some(format!("Missing: {}", filename)),
    }
}

/// Check the two expected exports of a session folder.
///
/// # Arguments
///
/// * `session_dir` - Session folder to inspect
/// * `config` - Provides the command and event filenames
///
/// # Returns
///
/// A [`SessionCheck`] whose reasons are `"Missing: <file>"` for an absent
/// export and `"<file>"` for a present but empty one.
pub fn evaluate_session(session_dir: &Path, config: &QuarantineConfig) -> Result<SessionCheck> {
    let mut reasons = Vec::with_capacity(2);

    for filename in [&config.command_file, &config.event_file] {
        let path = session_dir.join(filename);
        let status = file_status(&path).map_err(io_err(&path))?;
        reasons.extend(file_reason(status, filename));
    }

    Ok(SessionCheck {
        name: entry_name(session_dir),
        path: session_dir.to_path_buf(),
        reasons,
    })
}

/// Move a session folder into `quarantine_dir`, keeping its name.
///
/// Refuses to overwrite or merge into an existing destination.
pub fn move_session(session_dir: &Path, quarantine_dir: &Path) -> Result<PathBuf> {
    let dest = quarantine_dir.join(entry_name(session_dir));

    if dest.exists() {
        return Err(ScanError::DestinationExists {
            from: session_dir.to_path_buf(),
            to: dest,
        });
    }

    fs::rename(session_dir, &dest).map_err(io_err(session_dir))?;
    Ok(dest)
}

fn subject_log_header(parent: &Path, subject: &str) -> String {
    format!(
        "Parent Folder: {}\nSubject: {}\n\nSubfolders with empty CSV files:\n",
        parent.display(),
        subject
    )
}

/// Scan one subject folder and quarantine its invalid sessions.
///
/// Creates `<parent>/<prefix><subject>/` and writes the subject log
/// `<prefix><subject>.txt` inside it, one line per quarantined session as
/// the move happens. The finished subject log text, followed by a blank
/// line, is appended to `global_log`.
///
/// With `dry_run` set nothing is created or moved and no subject log is
/// written; the text still goes to `global_log`.
///
/// # Returns
///
/// A [`SubjectReport`] whose `remaining` is the number of directories left
/// directly under the subject folder.
pub fn check_subject(
    subject_dir: &Path,
    parent: &Path,
    config: &QuarantineConfig,
    dry_run: bool,
    global_log: &mut dyn Write,
) -> Result<SubjectReport> {
    let subject = entry_name(subject_dir);
    let quarantine_name = config.prefixed(&subject);
    let quarantine_dir = parent.join(&quarantine_name);
    let log_path = quarantine_dir.join(format!("{}.txt", quarantine_name));

    let sessions = list_subdirectories(subject_dir).map_err(io_err(subject_dir))?;

    let mut subject_log = if dry_run {
        None
    } else {
        fs::create_dir_all(&quarantine_dir).map_err(io_err(&quarantine_dir))?;
        Some(create_buffered_writer(&log_path)?)
    };

    let mut text = subject_log_header(parent, &subject);
    if let Some(log) = subject_log.as_mut() {
        log.write_all(text.as_bytes()).map_err(io_err(&log_path))?;
    }

    let mut quarantined = Vec::new();

    for session_dir in &sessions {
        let check = evaluate_session(session_dir, config)?;

        if !check.is_quarantinable() {
            debug!("{}/{}: both exports present", subject, check.name);
            continue;
        }

        if dry_run {
            info!(
                "Would quarantine {}/{} -> {}/",
                subject, check.name, quarantine_name
            );
        } else {
            move_session(session_dir, &quarantine_dir)?;
            warn!(
                "Quarantined {}/{} -> {}/ ({})",
                subject,
                check.name,
                quarantine_name,
                check.reasons.join(", ")
            );
        }

        let line = format!("{}\n", check.log_line());
        if let Some(log) = subject_log.as_mut() {
            log.write_all(line.as_bytes()).map_err(io_err(&log_path))?;
        }
        text.push_str(&line);
        quarantined.push(check);
    }

    if let Some(mut log) = subject_log.take() {
        log.flush().map_err(io_err(&log_path))?;
    }

    text.push('\n');
    global_log
        .write_all(text.as_bytes())
        .map_err(io_err(parent))?;

    let remaining = if dry_run {
        sessions.len() - quarantined.len()
    } else {
        list_subdirectories(subject_dir)
            .map_err(io_err(subject_dir))?
            .len()
    };

    Ok(SubjectReport {
        subject,
        quarantine_dir,
        log_path,
        quarantined,
        remaining,
    })
}

/// Scan every subject folder under `parent` and write the global log.
///
/// The subject list is snapshotted (sorted) before any quarantine folder is
/// created, and directories named with the quarantine prefix are skipped,
/// so quarantine folders from this or earlier runs are never treated as
/// subjects. The global log is `<parent>/<prefix><parent name>.txt`.
///
/// Work is not transactional: on error, moves and logs already completed
/// stay in place.
///
/// # Errors
///
/// Returns [`ScanError::InvalidPath`] before touching any file if `parent`
/// is not an existing directory.
pub fn check_parent(parent: &Path, config: &QuarantineConfig, dry_run: bool) -> Result<ScanSummary> {
    if !parent.is_dir() {
        return Err(ScanError::InvalidPath(parent.to_path_buf()));
    }

    let parent_name = entry_name(parent);
    let global_log_path = parent.join(format!("{}.txt", config.prefixed(&parent_name)));

    let subjects: Vec<PathBuf> = list_subdirectories(parent)
        .map_err(io_err(parent))?
        .into_iter()
        .filter(|dir| {
            let name = entry_name(dir);
            if config.is_quarantine_name(&name) {
                debug!("Skipping quarantine folder: {}", name);
                false
            } else {
                true
            }
        })
        .collect();

    let mut global_log: Box<dyn Write> = if dry_run {
        Box::new(io::sink())
    } else {
        Box::new(create_buffered_writer(&global_log_path)?)
    };
    let rule = "=".repeat(RULE_WIDTH);

    write!(
        global_log,
        "Global Log for Parent Folder: {}\n{}\n\n",
        parent.display(),
        rule
    )
    .map_err(io_err(&global_log_path))?;

    let mut reports = Vec::with_capacity(subjects.len());
    let mut total_remaining = 0;

    for subject_dir in &subjects {
        info!("Processing subject: {}", entry_name(subject_dir));
        let report = check_subject(subject_dir, parent, config, dry_run, &mut *global_log)?;
        total_remaining += report.remaining;
        reports.push(report);
    }

    write!(
        global_log,
        "\n{}\nTotal Remaining Subfolders in All Subjects: {}\n",
        rule, total_remaining
    )
    .map_err(io_err(&global_log_path))?;
    global_log.flush().map_err(io_err(&global_log_path))?;

    info!(
        "Global log written to {} ({} remaining)",
        global_log_path.display(),
        total_remaining
    );

    Ok(ScanSummary {
        global_log_path,
        subjects: reports,
        total_remaining,
        dry_run,
    })
}
