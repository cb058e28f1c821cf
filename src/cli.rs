//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// DropDash - student dropout analytics dashboard
///
/// Joins student records, school metadata and teacher deployment CSVs,
/// computes dropout KPIs and statistical comparisons, and writes a
/// single-page dashboard.
///
/// Examples:
///   dropdash --data-dir ./data
///   dropdash --data-dir ./data --format json --output kpis.json
///   dropdash --students s.csv --schools sc.csv --teachers t.csv
///   dropdash --data-dir ./data --dry-run
///   dropdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the three input CSV files
    ///
    /// File names default to Student_Records.csv, School_Info.csv and
    /// Teacher_Deployment.csv unless overridden.
    #[arg(short, long, value_name = "DIR", env = "DROPDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Student records file (relative to --data-dir)
    #[arg(long, value_name = "FILE")]
    pub students: Option<PathBuf>,

    /// School metadata file (relative to --data-dir)
    #[arg(long, value_name = "FILE")]
    pub schools: Option<PathBuf>,

    /// Teacher deployment file (relative to --data-dir)
    #[arg(long, value_name = "FILE")]
    pub teachers: Option<PathBuf>,

    /// Output file path for the dashboard
    ///
    /// Defaults to dropout_dashboard.html or the value in .dropdash.toml
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Dashboard title
    #[arg(short, long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dropdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and join the datasets without writing a dashboard
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .dropdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.exists() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Data path is not a directory: {}", dir.display()));
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err("Title must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn make_args() -> Args {
        Args {
            data_dir: None,
            students: None,
            schools: None,
            teachers: None,
            output: None,
            format: None,
            title: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "dropdash",
            "--students",
            "s.csv",
            "--format",
            "markdown",
            "-o",
            "out.md",
        ])
        .unwrap();

        assert_eq!(args.students, Some(PathBuf::from("s.csv")));
        assert_eq!(args.format, Some(OutputFormat::Markdown));
        assert_eq!(args.output, Some(PathBuf::from("out.md")));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_output_is_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut args = make_args();
        args.output = Some(temp_dir.path().to_path_buf());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
