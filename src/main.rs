//! DropDash - student dropout analytics dashboard
//!
//! A CLI tool that joins student, school and teacher datasets,
//! computes dropout KPIs and statistical comparisons, and writes
//! a single-page dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any fatal error (arguments, config, missing or malformed input, write failure)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use loader::DatasetPaths;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("DropDash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_dashboard(args).await {
        error!("Dashboard generation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .dropdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your datasets and customize the report.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the load, join, aggregate and render pipeline once.
async fn run_dashboard(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let paths = DatasetPaths::from(&config.data);

    // Step 1: Load the datasets
    if !args.quiet {
        println!("📥 Loading datasets:");
        println!("   Students: {}", paths.students.display());
        println!("   Schools:  {}", paths.schools.display());
        println!("   Teachers: {}", paths.teachers.display());
    }

    for path in paths.missing() {
        warn!("Input file not found: {}", path.display());
    }

    let datasets = loader::load_datasets(&paths, !args.quiet)
        .await
        .context("Failed to load input datasets")?;

    // Step 2: Join into the working table
    let table = pipeline::build_working_table(
        &datasets.students,
        &datasets.schools,
        &datasets.teachers,
    );
    let stats = &table.join_stats;
    info!("Working table has {} rows", table.len());
    if stats.unmatched_school > 0 {
        warn!(
            "{} students have no matching school record",
            stats.unmatched_school
        );
    }

    // Handle --dry-run: report the join and exit
    if args.dry_run {
        return handle_dry_run(&table);
    }

    // Step 3: Aggregate and build the dashboard
    if !args.quiet {
        println!("\n📊 Computing statistics...");
    }
    let duration = start_time.elapsed().as_secs_f64();
    let dashboard = report::build_dashboard(&table, &config.report, &paths, duration);

    // Step 4: Render and save
    let output_path = Path::new(&config.general.output);
    let content = report::render(&dashboard, config.report.format, &config.report.plotly_cdn)?;
    report::write_dashboard(&content, output_path)?;

    if !args.quiet {
        let kpis = &dashboard.kpis;
        println!("\n📋 Dashboard Summary:");
        println!("   Students: {}", kpis.total_students);
        for card in &dashboard.cards {
            println!("   {}: {}", card.label, card.display);
        }
        for chart in dashboard.charts() {
            if let Some(ref note) = chart.note {
                println!("   ⚠️  {}: {}", chart.heading, note);
            }
        }
        println!("   Duration: {:.2}s", start_time.elapsed().as_secs_f64());
        println!(
            "\n✅ Dashboard ({}) saved to: {}",
            config.report.format,
            output_path.display()
        );
    }

    Ok(())
}

/// Handle --dry-run: print table sizes and join results, write nothing.
fn handle_dry_run(table: &models::WorkingTable) -> Result<()> {
    let stats = &table.join_stats;

    println!("\n🔍 Dry run: datasets loaded and joined (no dashboard written)\n");
    println!("   Student records:      {}", stats.students);
    println!("   School records:       {}", stats.schools);
    println!("   Teacher assignments:  {}", stats.teacher_assignments);
    println!("   Working table rows:   {}", table.len());
    println!("   Without school data:  {}", stats.unmatched_school);
    println!("   Without teacher data: {}", stats.unmatched_teacher);
    println!("   Duplicate school ids: {}", stats.duplicate_schools);
    println!(
        "   Unparseable values:   {} attendance, {} infrastructure, {} experience",
        stats.invalid_attendance, stats.invalid_infrastructure, stats.invalid_experience
    );

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dashboard, OutputFormat};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_args(output: PathBuf) -> Args {
        let mut args = cli::tests::make_args();
        args.data_dir = Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"));
        args.output = Some(output);
        args.quiet = true;
        args
    }

    #[tokio::test]
    async fn test_run_dashboard_on_sample_data() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("board.json");

        let mut args = sample_args(output.clone());
        args.format = Some(OutputFormat::Json);
        run_dashboard(args).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let dashboard: Dashboard = serde_json::from_str(&written).unwrap();

        assert_eq!(dashboard.kpis.total_students, 12);
        assert_eq!(dashboard.kpis.dropout_count, 5);
        assert_eq!(dashboard.metadata.join_stats.unmatched_school, 1);
        assert_eq!(dashboard.metadata.join_stats.invalid_attendance, 1);
        assert_eq!(dashboard.charts().count(), 5);
    }

    #[tokio::test]
    async fn test_run_dashboard_is_reproducible() {
        let temp_dir = TempDir::new().unwrap();
        let first_path = temp_dir.path().join("first.json");
        let second_path = temp_dir.path().join("second.json");

        for path in [&first_path, &second_path] {
            let mut args = sample_args(path.clone());
            args.format = Some(OutputFormat::Json);
            run_dashboard(args).await.unwrap();
        }

        let read = |p: &PathBuf| -> Dashboard {
            serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap()
        };
        let first = read(&first_path);
        let second = read(&second_path);

        assert_eq!(first.kpis, second.kpis);
        assert_eq!(first.cards, second.cards);
        assert_eq!(first.rows, second.rows);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("board.html");

        let mut args = sample_args(output.clone());
        args.dry_run = true;
        run_dashboard(args).await.unwrap();

        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("board.html");

        let mut args = sample_args(output.clone());
        args.teachers = Some(PathBuf::from("does_not_exist.csv"));

        assert!(run_dashboard(args).await.is_err());
        assert!(!output.exists());
    }
}
