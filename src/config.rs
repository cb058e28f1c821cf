//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dropdash.toml` files.

use crate::models::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".dropdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input dataset locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "dropout_dashboard.html".to_string()
}

/// Where the three CSV inputs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory the file names below are resolved against.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_students")]
    pub students: String,

    #[serde(default = "default_schools")]
    pub schools: String,

    #[serde(default = "default_teachers")]
    pub teachers: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            students: default_students(),
            schools: default_schools(),
            teachers: default_teachers(),
        }
    }
}

fn default_data_dir() -> String {
    ".".to_string()
}

fn default_students() -> String {
    "Student_Records.csv".to_string()
}

fn default_schools() -> String {
    "School_Info.csv".to_string()
}

fn default_teachers() -> String {
    "Teacher_Deployment.csv".to_string()
}

/// Dashboard rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Line shown under the title.
    #[serde(default = "default_subtitle")]
    pub subtitle: String,

    /// Output format when none is given on the command line.
    #[serde(default)]
    pub format: OutputFormat,

    /// Script URL for Plotly.js in HTML output.
    #[serde(default = "default_plotly_cdn")]
    pub plotly_cdn: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            format: OutputFormat::default(),
            plotly_cdn: default_plotly_cdn(),
        }
    }
}

fn default_title() -> String {
    "Dropout Prediction KPIs Dashboard".to_string()
}

fn default_subtitle() -> String {
    "Professional insights into dropout and related factors.".to_string()
}

fn default_plotly_cdn() -> String {
    "https://cdn.plot.ly/plotly-2.35.2.min.js".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.data.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref students) = args.students {
            self.data.students = students.to_string_lossy().to_string();
        }
        if let Some(ref schools) = args.schools {
            self.data.schools = schools.to_string_lossy().to_string();
        }
        if let Some(ref teachers) = args.teachers {
            self.data.teachers = teachers.to_string_lossy().to_string();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.to_string_lossy().to_string();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref title) = args.title {
            self.report.title = title.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "dropout_dashboard.html");
        assert_eq!(config.data.students, "Student_Records.csv");
        assert_eq!(config.report.format, OutputFormat::Html);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "board.json"

[data]
data_dir = "datasets"
teachers = "teachers_2024.csv"

[report]
title = "District Review"
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "board.json");
        assert_eq!(config.data.data_dir, "datasets");
        assert_eq!(config.data.teachers, "teachers_2024.csv");
        assert_eq!(config.data.students, "Student_Records.csv");
        assert_eq!(config.report.title, "District Review");
        assert_eq!(config.report.format, OutputFormat::Json);
    }

    #[test]
    fn test_merge_only_overrides_given_values() {
        let mut config = Config::default();
        config.report.title = "From file".to_string();
        config.data.data_dir = "file_dir".to_string();

        let mut args = make_args();
        args.students = Some(PathBuf::from("kids.csv"));
        args.format = Some(OutputFormat::Markdown);
        config.merge_with_args(&args);

        assert_eq!(config.report.title, "From file");
        assert_eq!(config.data.data_dir, "file_dir");
        assert_eq!(config.data.students, "kids.csv");
        assert_eq!(config.report.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data.schools, "School_Info.csv");
    }
}
