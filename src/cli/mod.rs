//! Command-line interface for the storybook pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::processors::quarantine::ScanError;
use crate::PipelineConfig;

const INVALID_PATH_MESSAGE: &str = "Invalid folder path. Please check and try again.";

#[derive(Parser)]
#[command(name = "storybook-pipeline")]
#[command(about = "Session folder quarantine and CSV combining tools", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move session folders with missing or empty CSV exports into empty-<subject> folders
    Quarantine {
        /// Parent folder containing subject folders (prompted for if omitted)
        parent: Option<PathBuf>,
        /// Preview changes without moving folders or writing logs
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the names of a folder's subfolders to a text file
    ListSubfolders {
        /// Folder whose subfolders to list
        folder: PathBuf,
        /// Output text file
        output: PathBuf,
    },

    /// Combine a folder of timestamped CSV exports into one CSV
    Combine {
        /// Folder containing the CSV exports
        input_folder: PathBuf,
        /// Combined CSV output path
        output_csv: PathBuf,
        /// Also write an Excel workbook to this path
        #[arg(long)]
        excel: Option<PathBuf>,
    },

    /// Combine every <subject>-converted folder under a base folder
    CombineAll {
        /// Base folder containing <subject>-converted folders
        base_folder: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 38 {
            format!("{}...", value.chars().take(35).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<38} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Ask for the parent folder on the terminal.
fn prompt_parent_folder() -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt("Enter the path to the parent folder")
        .allow_empty(true)
        .interact_text()
        .context("prompt failed")?;
    Ok(PathBuf::from(answer.trim()))
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Quarantine { parent, dry_run } => {
            cmd_quarantine(parent, dry_run, &config);
        }
        Commands::ListSubfolders { folder, output } => {
            cmd_list_subfolders(&folder, &output);
        }
        Commands::Combine { input_folder, output_csv, excel } => {
            cmd_combine(&input_folder, &output_csv, excel.as_deref(), &config);
        }
        Commands::CombineAll { base_folder } => {
            cmd_combine_all(&base_folder, &config);
        }
    }
}

fn cmd_quarantine(parent: Option<PathBuf>, dry_run: bool, config: &PipelineConfig) {
    use crate::processors::quarantine;

    let parent = match parent {
        Some(p) => p,
        None => match prompt_parent_folder() {
            Ok(p) => p,
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(1);
            }
        },
    };

    if !parent.is_dir() {
        println!("{}", INVALID_PATH_MESSAGE);
        return;
    }

    let start = Instant::now();

    if dry_run {
        println!("DRY RUN: No folders will be moved and no logs written");
    }

    let spinner = create_spinner("Checking session folders for empty CSV files...");

    match quarantine::check_parent(&parent, &config.quarantine, dry_run) {
        Ok(summary) => {
            spinner.finish_and_clear();

            for subject in &summary.subjects {
                for session in &subject.quarantined {
                    let action = if dry_run { "Would move" } else { "Moved" };
                    println!(
                        "{} {}/{} -> {}/",
                        action,
                        subject.subject,
                        session.name,
                        subject.quarantine_dir.display()
                    );
                }
            }

            if !dry_run {
                println!("Global log written to {}", summary.global_log_path.display());
            }
            println!("Total Remaining Subfolders: {}", summary.total_remaining);

            print_summary(
                "Quarantine Complete",
                &[
                    ("Parent folder", parent.display().to_string()),
                    ("Subjects", summary.subjects.len().to_string()),
                    ("Quarantined", summary.total_quarantined().to_string()),
                    ("Remaining", summary.total_remaining.to_string()),
                    ("Global log", summary.global_log_path.display().to_string()),
                    ("Dry run", dry_run.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(ScanError::InvalidPath(_)) => {
            spinner.finish_and_clear();
            println!("{}", INVALID_PATH_MESSAGE);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Quarantine failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_list_subfolders(folder: &Path, output: &Path) {
    use crate::processors::listing;

    match listing::save_subfolder_names(folder, output) {
        Ok(names) => {
            println!("Subfolder names saved to {}", output.display());
            print_summary(
                "Subfolder Listing Complete",
                &[
                    ("Folder", folder.display().to_string()),
                    ("Subfolders", names.len().to_string()),
                    ("Output file", output.display().to_string()),
                ],
            );
        }
        Err(e) => {
            error!("Listing failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_combine(input_folder: &Path, output_csv: &Path, excel: Option<&Path>, config: &PipelineConfig) {
    use crate::processors::combining;

    let start = Instant::now();
    let spinner = create_spinner("Combining CSV files...");

    let result = match excel {
        Some(xlsx) => combining::combine_folder_with_excel(input_folder, output_csv, xlsx, &config.combine),
        None => combining::combine_csv_files(input_folder, output_csv, &config.combine),
    };

    match result {
        Ok(output) => {
            spinner.finish_and_clear();

            let mut items = vec![
                ("Input folder", input_folder.display().to_string()),
                ("Files combined", output.files.len().to_string()),
                ("Rows", output.rows.to_string()),
                ("Output CSV", output.output_csv.display().to_string()),
            ];
            if let Some(xlsx) = &output.output_excel {
                items.push(("Output Excel", xlsx.display().to_string()));
            }
            items.push(("Duration", format!("{:.2?}", start.elapsed())));

            print_summary("Combine Complete", &items);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Combine failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_combine_all(base_folder: &Path, config: &PipelineConfig) {
    use crate::processors::combining;

    let start = Instant::now();
    let spinner = create_spinner("Combining converted subject folders...");

    match combining::combine_all_subjects(base_folder, &config.combine) {
        Ok(summary) => {
            spinner.finish_and_clear();

            for output in &summary.combined {
                println!(
                    "{} -> {} ({} rows)",
                    output.input_folder.display(),
                    output.output_csv.display(),
                    output.rows
                );
            }
            for (folder, e) in &summary.failed {
                eprintln!("Failed {}: {}", folder.display(), e);
            }

            print_summary(
                "Combine All Complete",
                &[
                    ("Base folder", base_folder.display().to_string()),
                    ("Subjects combined", summary.combined.len().to_string()),
                    ("Subjects failed", summary.failed.len().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Combine all failed: {}", e);
            std::process::exit(1);
        }
    }
}
