//! Configuration types for the storybook pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the empty-session quarantine scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineConfig {
    /// Filename of the command export expected in every session folder
    #[serde(default = "default_command_file")]
    pub command_file: String,

    /// Filename of the event export expected in every session folder
    #[serde(default = "default_event_file")]
    pub event_file: String,

    /// Prefix for quarantine folders and log files (e.g. `empty-c001`)
    #[serde(default = "default_quarantine_prefix")]
    pub prefix: String,
}

fn default_command_file() -> String {
    "storybook_command.csv".to_string()
}

fn default_event_file() -> String {
    "storybook_event.csv".to_string()
}

fn default_quarantine_prefix() -> String {
    "empty-".to_string()
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            command_file: default_command_file(),
            event_file: default_event_file(),
            prefix: default_quarantine_prefix(),
        }
    }
}

impl QuarantineConfig {
    /// Name of the quarantine folder (and log stem) for `name`.
    pub fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// True if `name` is a folder this scan created.
    pub fn is_quarantine_name(&self, name: &str) -> bool {
        !self.prefix.is_empty() && name.starts_with(&self.prefix)
    }
}

/// Configuration for combining per-session CSV exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineConfig {
    /// Suffix marking a subject's converted-export folder
    #[serde(default = "default_converted_suffix")]
    pub converted_suffix: String,

    /// chrono format of the timestamp embedded in export filenames
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Prefix for combined output files
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
}

fn default_converted_suffix() -> String {
    "-converted".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d-%H-%M-%S".to_string()
}

fn default_output_prefix() -> String {
    "combined_".to_string()
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            converted_suffix: default_converted_suffix(),
            timestamp_format: default_timestamp_format(),
            output_prefix: default_output_prefix(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub quarantine: QuarantineConfig,

    #[serde(default)]
    pub combine: CombineConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_quarantine_config() {
        let config = QuarantineConfig::default();
        assert_eq!(config.command_file, "storybook_command.csv");
        assert_eq!(config.event_file, "storybook_event.csv");
        assert_eq!(config.prefixed("c001"), "empty-c001");
    }

    #[test]
    fn test_is_quarantine_name() {
        let config = QuarantineConfig::default();
        assert!(config.is_quarantine_name("empty-c001"));
        assert!(!config.is_quarantine_name("c001"));

        let no_prefix = QuarantineConfig {
            prefix: String::new(),
            ..QuarantineConfig::default()
        };
        assert!(!no_prefix.is_quarantine_name("c001"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "quarantine:\n  prefix: \"bad-\"\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.quarantine.prefix, "bad-");
        assert_eq!(config.quarantine.event_file, "storybook_event.csv");
        assert_eq!(config.combine.converted_suffix, "-converted");
    }

    #[test]
    fn test_yaml_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.yaml");

        let mut config = PipelineConfig::default();
        config.combine.timestamp_format = "%Y%m%d%H%M%S".to_string();
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.combine.timestamp_format, "%Y%m%d%H%M%S");
        assert_eq!(loaded.quarantine.prefix, "empty-");
    }
}
