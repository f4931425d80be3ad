use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use booking_recon::export::{comparison_rows, delivery_rows, export_to_file};
use booking_recon::loader::{load_deliveries, load_records};
use booking_recon::{Comparator, DeliveryLedger, DeliveryValidator, ReconConfig, Reconciliation};

#[derive(Debug, Parser)]
#[command(
    name = "booking-recon",
    version,
    about = "Reconcile parking bookings and validate cash-register deliveries",
    after_help = "Examples:\n  booking-recon compare primary.csv backoffice.csv\n  \
                  booking-recon validate primary.csv backoffice.csv monday.csv tuesday.csv --auto"
)]
struct Cli {
    /// JSON configuration file (tolerance, brand suffixes, cities)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compare the primary and back-office booking exports")]
    Compare {
        primary: PathBuf,
        secondary: PathBuf,
        #[arg(long, help = "Write the comparison rows to this CSV file")]
        export: Option<PathBuf>,
    },
    #[command(about = "Validate delivery files (one batch each) against the reconciled bookings")]
    Validate {
        primary: PathBuf,
        secondary: PathBuf,
        #[arg(required = true)]
        deliveries: Vec<PathBuf>,
        #[arg(long, help = "Auto-validate deliveries with no findings")]
        auto: bool,
        #[arg(long, help = "Write the delivery rows to this CSV file")]
        export: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReconConfig::from_file(path)?,
        None => ReconConfig::default(),
    };

    match cli.command {
        Command::Compare { primary, secondary, export } => {
            run_compare(&config, &primary, &secondary, export.as_deref())
        }
        Command::Validate { primary, secondary, deliveries, auto, export } => {
            run_validate(&config, &primary, &secondary, &deliveries, auto, export.as_deref())
        }
    }
}

fn reconcile(config: &ReconConfig, primary: &Path, secondary: &Path) -> Result<Reconciliation> {
    let primary = load_records(primary)?;
    let secondary = load_records(secondary)?;

    Ok(Comparator::from_config(config).compare(&primary, &secondary))
}

fn run_compare(
    config: &ReconConfig,
    primary: &Path,
    secondary: &Path,
    export: Option<&Path>,
) -> Result<()> {
    let reconciliation = reconcile(config, primary, secondary)?;
    let summary = reconciliation.summary();
    info!("{}", summary.summary());

    if let Some(path) = export {
        export_to_file(path, &comparison_rows(&reconciliation))?;
        info!(path = %path.display(), "comparison exported");
    }

    let output = json!({
        "summary": summary,
        "duplicates": reconciliation.duplicates(),
        "skipped_without_plate": reconciliation.skipped_without_plate(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_validate(
    config: &ReconConfig,
    primary: &Path,
    secondary: &Path,
    deliveries: &[PathBuf],
    auto: bool,
    export: Option<&Path>,
) -> Result<()> {
    let reconciliation = reconcile(config, primary, secondary)?;
    let validator = DeliveryValidator::from_config(config);

    let mut ledger = DeliveryLedger::new();
    for path in deliveries {
        let batch = load_deliveries(path)?;
        let (next, report) = validator.ingest(ledger, &batch, &reconciliation);
        info!("{}", report.summary());
        ledger = next;
    }

    if auto {
        ledger.auto_validate_ready();
    }

    let summary = ledger.summary();
    info!("{}", summary.summary());

    if let Some(path) = export {
        export_to_file(path, &delivery_rows(&ledger))?;
        info!(path = %path.display(), "deliveries exported");
    }

    let output = json!({
        "comparison": reconciliation.summary(),
        "deliveries": summary,
        "imports": ledger.imports(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
