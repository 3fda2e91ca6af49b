//! schemasync CLI
//!
//! Compares MySQL schemas and applies the DDL that brings a target in line
//! with a source.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use schemasync::prelude::*;
use schemasync::snapshot::load_snapshot;

/// Synchronize MySQL schemas.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diff between two snapshot files as JSON.
    Diff {
        /// Snapshot of the desired schema.
        source: PathBuf,
        /// Snapshot of the schema to change.
        target: PathBuf,
    },

    /// Print the migration plan between two snapshot files.
    Plan {
        /// Snapshot of the desired schema.
        source: PathBuf,
        /// Snapshot of the schema to change.
        target: PathBuf,

        /// Print the rollback plan instead.
        #[arg(short, long)]
        reverse: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Sql)]
        format: Format,
    },

    /// Synchronize a target database with a source database.
    Sync(SyncArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Sql,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Diff { source, target } => {
            let source = load_snapshot(&source).await?;
            let target = load_snapshot(&target).await?;
            let diff = compare_schemas(&source, &target)?;
            println!("{}", serde_json::to_string_pretty(&diff)?);
        }

        Commands::Plan {
            source,
            target,
            reverse,
            format,
        } => {
            let source = load_snapshot(&source).await?;
            let target = load_snapshot(&target).await?;
            let mut diff = compare_schemas(&source, &target)?;
            if reverse {
                diff = diff.reversed();
            }
            if diff.is_empty() {
                info!("Schemas are already synchronized.");
                return Ok(());
            }

            let plan = Planner::new().plan(&diff)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                Format::Sql => {
                    print!("{}", plan.to_sql_script());
                    for warning in plan.warnings() {
                        warn!("{warning}");
                    }
                }
            }
        }

        Commands::Sync(args) => {
            let config = SyncConfig::from(&args);
            let extractor = SnapshotExtractor::new()
                .register_role(Role::Source, &args.source_snapshot)
                .register_role(Role::Target, &args.target_snapshot);
            let orchestrator = SyncOrchestrator::new(config, MySqlDatabase::new(), extractor)
                .with_reporter(Arc::new(TracingReporter));

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for ctrl+c");
                    return;
                }
                warn!("Interrupt received, cancelling");
                on_signal.cancel();
            });

            let result = orchestrator.run(&cancel).await;
            print_result(&result);
            if let Some(err) = result.error {
                return Err(err.into());
            }
        }
    }

    Ok(())
}

fn print_result(result: &ExecutionResult) {
    if result.already_synchronized() {
        println!("Schemas are already synchronized.");
        return;
    }

    if let Some(plan) = &result.plan {
        let summary = plan.summary();
        println!("\nMigration plan:");
        println!("{:-<60}", "");
        println!(
            " tables:      +{} -{} ~{}",
            summary.tables_created, summary.tables_dropped, summary.tables_modified
        );
        println!(
            " columns:     +{} -{} ~{}",
            summary.columns_added, summary.columns_dropped, summary.columns_modified
        );
        println!(
            " indexes:     +{} -{}",
            summary.indexes_created, summary.indexes_dropped
        );
        println!(
            " constraints: +{} -{}",
            summary.constraints_added, summary.constraints_dropped
        );
        println!(" destructive: {}", summary.destructive_statements);

        if result.dry_run {
            println!("\nSQL (dry run, not executed):");
            print!("{}", plan.to_sql_script());
        }
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!(" ! {warning}");
        }
    }

    if !result.dry_run {
        println!(
            "\nExecuted {} statement(s) in {:.2?}.",
            result.executed_statements.len(),
            result.duration
        );
    }

    if let Some(err) = &result.error {
        eprintln!("\nError: {err}");
        for (key, value) in err.context() {
            eprintln!("  {key}: {value}");
        }
        eprintln!("\nHint: {}", err.troubleshooting());
    }
}
