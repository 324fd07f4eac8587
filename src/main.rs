use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use sisant_ingest::pipeline::{CleanBatch, Pipeline, PipelineReport};
use sisant_ingest::report::RegistrySummary;
use sisant_ingest::{config::PipelineConfig, ingest, logging};

#[derive(Parser)]
#[command(name = "sisant_ingest")]
#[command(about = "SISANT UAV registry ingestion and canonicalization pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a registry export and optionally persist the result
    Process {
        /// Path to the registry CSV export
        #[arg(long)]
        input: PathBuf,
        /// TOML file overriding the built-in vocabularies
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference date (YYYY-MM-DD) for status derivation
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Write the clean batch (records and report) as pretty JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
        /// Write the clean records as semicolon-delimited CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,
    },
    /// Clean a registry export and print aggregate views
    Summary {
        /// Path to the registry CSV export
        #[arg(long)]
        input: PathBuf,
        /// TOML file overriding the built-in vocabularies
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference date (YYYY-MM-DD) for status derivation
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            config,
            today,
            json_out,
            csv_out,
        } => {
            let config = load_config(config.as_deref(), today)?;
            let batch = run_batch(&input, &config)?;
            print_report(&batch.report);

            if let Some(path) = json_out {
                batch
                    .persist_to_json(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("💾 Saved clean batch to {}", path.display());
            }
            if let Some(path) = csv_out {
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                ingest::write_clean_csv(file, &batch.records)?;
                println!("💾 Saved clean records to {}", path.display());
            }
        }
        Commands::Summary {
            input,
            config,
            today,
        } => {
            let config = load_config(config.as_deref(), today)?;
            let batch = run_batch(&input, &config)?;
            print_report(&batch.report);

            let scope = config.model_scope.as_ref().map(|s| s.manufacturer.as_str());
            let summary = RegistrySummary::from_records(&batch.records, scope);
            print_summary(&summary, scope);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, today: Option<NaiveDate>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if today.is_some() {
        config.today = today;
    }
    Ok(config)
}

fn run_batch(input: &Path, config: &PipelineConfig) -> anyhow::Result<CleanBatch> {
    println!("🔄 Processing registry export {}...", input.display());

    let ingested = ingest::read_registry_path(input)
        .with_context(|| format!("reading {}", input.display()))?;
    info!("Decoded {} rows from {}", ingested.records.len(), input.display());
    if ingested.broken_rows > 0 {
        println!("⚠️  {} undecodable rows skipped", ingested.broken_rows);
    }

    let pipeline = Pipeline::new(config)?;
    let batch = pipeline.run(ingested.records)?;
    Ok(batch)
}

fn print_report(report: &PipelineReport) {
    println!("\n📊 Pipeline results (reference date {}):", report.today);
    println!("   Rows in: {}", report.rows_in);
    println!("   Malformed ids: {}", report.invalid_ids);
    println!("   Duplicates removed: {}", report.duplicates_removed);
    println!(
        "   Dropped at assembly: {} missing fields, {} bad dates, {} unknown use types",
        report.missing_field_drops, report.bad_date_drops, report.unknown_use_drops
    );
    println!(
        "   Operator names corrected: {}",
        report.operator_names_corrected
    );
    println!(
        "   Labels collapsed: {} manufacturers, {} activities, {} models",
        report.manufacturer_labels_collapsed,
        report.activity_labels_collapsed,
        report.model_labels_collapsed
    );
    println!("   Rows out: {}", report.rows_out);
}

fn print_summary(summary: &RegistrySummary, scope: Option<&str>) {
    println!("\n📋 Registry summary ({} records):", summary.total_records);

    println!("\n   Status:");
    for row in &summary.status {
        println!(
            "      {:<12} {:>8} ({:.1}%)",
            row.label,
            row.count,
            row.share * 100.0
        );
    }

    println!("\n   Type of use:");
    for row in &summary.type_of_use {
        println!(
            "      {:<12} {:>8} ({:.1}%)",
            row.label,
            row.count,
            row.share * 100.0
        );
    }

    println!("\n   Registrations per month:");
    for month in &summary.monthly_registrations {
        println!("      {}  {:>8}", month.month.format("%Y-%m"), month.count);
    }

    println!("\n   Activity by legal entity (individual / company):");
    for row in &summary.activity_by_legal_entity {
        println!(
            "      {:<16} {:>7} / {:<7}",
            row.activity, row.individual, row.company
        );
    }

    println!("\n   Manufacturers:");
    for row in summary.manufacturers.iter().take(10) {
        println!(
            "      {:<16} {:>8} ({:.1}%)",
            row.label,
            row.count,
            row.share * 100.0
        );
    }

    println!("\n   Manufacturer by legal entity (individual / company):");
    for row in summary.manufacturer_by_legal_entity.iter().take(10) {
        println!(
            "      {:<16} {:>7} / {:<7}",
            row.manufacturer, row.individual, row.company
        );
    }

    if let Some(scope) = scope {
        println!("\n   Models under '{}':", scope);
        for row in &summary.models_in_scope {
            println!(
                "      {:<16} {:>8} ({:.1}%)",
                row.label,
                row.count,
                row.share * 100.0
            );
        }
    }
}
