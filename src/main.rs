//! Volleyball scouting pipeline CLI
//!
//! Batch ingestion, cleaning, derivation, and reporting over a match
//! event log.

use clap::{Parser, Subcommand};
use volley::{Config, Result};

#[derive(Parser)]
#[command(name = "volley")]
#[command(about = "Volleyball match log ingestion and scouting statistics", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Run the full pipeline: load, clean, derive, aggregate
    Run {
        /// Input CSV file (defaults to the configured input path)
        file: Option<String>,
    },
    /// Reset the raw table and bulk-load a CSV file
    Load {
        /// Input CSV file (defaults to the configured input path)
        file: Option<String>,
    },
    /// Clean categorical columns in place
    Clean,
    /// Derive rally/team/player tables and recompute aggregates
    Derive,
    /// Write scouting reports and the team comparison
    Report,
    /// Export the derived result sets
    Export {
        /// Output format
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Output directory
        #[arg(long, default_value = "exports")]
        dir: String,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Run { file } => commands::run(&config, file),
        Commands::Load { file } => commands::load(&config, file),
        Commands::Clean => commands::clean(&config),
        Commands::Derive => commands::derive(&config),
        Commands::Report => commands::report(&config),
        Commands::Export { format, dir } => commands::export(&config, format, &dir),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use volley::aggregate;
    use volley::data::{loader, Database};
    use volley::normalize::{self, CleanReport};
    use volley::Side;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.report.output_dir)?;
        println!("Created data/ and {}/ directories", config.report.output_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'volley run <file.csv>' to build the tables");
        println!("  3. Run 'volley report' to write scouting reports");

        Ok(())
    }

    pub fn run(config: &Config, file: Option<String>) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        let path = file.unwrap_or_else(|| config.data.input_path.clone());

        println!("Loading {}...", path);
        let loaded = loader::load_file(&mut db, &path)?;
        println!("Loaded {} raw events", loaded);

        let report = normalize::normalize_raw_events(&db)?;
        print_clean_report(&report);

        db.reset_derived()?;
        let summary = aggregate::run(&mut db)?;
        print_summary(&summary);

        Ok(())
    }

    pub fn load(config: &Config, file: Option<String>) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        let path = file.unwrap_or_else(|| config.data.input_path.clone());

        println!("Loading {}...", path);
        let loaded = loader::load_file(&mut db, &path)?;
        println!("Loaded {} raw events", loaded);

        Ok(())
    }

    pub fn clean(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let report = normalize::normalize_raw_events(&db)?;
        print_clean_report(&report);
        Ok(())
    }

    pub fn derive(config: &Config) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        db.reset_derived()?;
        let summary = aggregate::run(&mut db)?;
        print_summary(&summary);
        Ok(())
    }

    pub fn report(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        for side in Side::BOTH {
            let path = volley::report::write_scouting_report(&db, config, side)?;
            println!("Scouting report saved as {}", path.display());
        }

        let path = volley::report::write_comparison(&db, config)?;
        println!("Comparison saved as {}", path.display());

        Ok(())
    }

    pub fn export(config: &Config, format: ExportFormat, dir: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let dir = std::path::Path::new(dir);

        match format {
            ExportFormat::Csv => {
                for path in volley::report::export_tables(&db, dir)? {
                    println!("Exported {}", path.display());
                }
            }
            ExportFormat::Json => {
                let path = volley::report::export_json(&db, dir)?;
                println!("Exported {}", path.display());
            }
        }

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Raw events:   {}", stats.raw_events);
        println!("  Rallies:      {}", stats.rallies);
        println!("  Team A rows:  {}", stats.team_a_records);
        println!("  Team B rows:  {}", stats.team_b_records);
        println!("  Players:      {}", stats.players);

        Ok(())
    }

    fn print_clean_report(report: &CleanReport) {
        if report.is_clean() {
            println!("Cleaning: all categorical values already in vocabulary");
            return;
        }
        println!(
            "Cleaning: {} blank value(s), {} out-of-vocabulary value(s) set to NULL",
            report.total_blanked(),
            report.total_coerced()
        );
        for (column, count) in &report.blanked {
            println!("  {}: {} blanked", column, count);
        }
        for (column, count) in &report.coerced {
            println!("  {}: {} coerced", column, count);
        }
    }

    fn print_summary(summary: &aggregate::PipelineSummary) {
        println!("Derived {} rallies", summary.rallies);
        if summary.skipped_rows > 0 {
            println!("  Skipped {} raw row(s) without a rally id", summary.skipped_rows);
        }
        println!(
            "Team records: {} (A), {} (B)",
            summary.team_a_records, summary.team_b_records
        );
        println!("Players: {}", summary.players);
    }
}
