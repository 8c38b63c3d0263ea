//! netsync - Network Inventory Reconciliation
//!
//! Entry point for the `netsync` command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use netsyncd::commands::{self, CollectInputs, SyncOptions};
use netsyncd::logging::init_logging;
use netsyncd::summary::{render_collect, render_diff, render_report};
use netsyncd::{NetsyncConfig, SyncOutcome, DEFAULT_CONFIG_PATH};

/// Reconcile a network inventory against a snapshot or the live network
#[derive(Parser, Debug)]
#[command(name = "netsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Keep applying after a failed record (overrides [sync])
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    continue_on_failure: Option<bool>,

    /// Never delete target records missing from the source (overrides [sync])
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    skip_unmatched_dst: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show what a sync would change
    Diff {
        /// Bulk document of the system of truth
        #[arg(short, long)]
        source: PathBuf,

        /// Bulk document of the inventory
        #[arg(short, long)]
        target: PathBuf,
    },

    /// Converge the inventory onto a bulk snapshot
    Sync {
        #[arg(short, long)]
        source: PathBuf,

        /// Inventory to converge; empty when omitted
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Write the converged inventory here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the target hook journal here
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Compute the diff without applying it
        #[arg(long)]
        dry_run: bool,
    },

    /// Collect the live network from facts files and converge the inventory onto it
    Collect {
        /// JSON list of devices
        #[arg(short, long)]
        inventory: PathBuf,

        /// Directory of per-device facts files
        #[arg(short, long)]
        facts: PathBuf,

        /// Links file for external-topology-tool cabling
        #[arg(long)]
        topology: Option<PathBuf>,

        #[arg(short, long)]
        target: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        journal: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },
}

fn load_config(args: &Args) -> anyhow::Result<NetsyncConfig> {
    let mut config = NetsyncConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(enabled) = args.continue_on_failure {
        config.sync.continue_on_failure = enabled;
    }
    if let Some(enabled) = args.skip_unmatched_dst {
        config.sync.skip_unmatched_dst = enabled;
    }
    config.validate()?;
    Ok(config)
}

fn print_sync(outcome: &SyncOutcome) {
    print!("{}", render_diff(&outcome.diff));
    match &outcome.report {
        Some(report) => print!("{}", render_report(report)),
        None => println!("dry run, nothing applied"),
    }
}

fn exit_code(clean: bool) -> ExitCode {
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(args: Args, config: NetsyncConfig) -> anyhow::Result<ExitCode> {
    match args.command {
        Command::Diff { source, target } => {
            let diff = commands::run_diff(&config, &source, &target).context("diff failed")?;
            print!("{}", render_diff(&diff));
            Ok(ExitCode::SUCCESS)
        }
        Command::Sync {
            source,
            target,
            output,
            journal,
            dry_run,
        } => {
            let options = SyncOptions {
                target,
                output,
                journal,
                dry_run,
            };
            let outcome = commands::run_sync(&config, &source, &options).context("sync failed")?;
            print_sync(&outcome);
            Ok(exit_code(outcome.is_clean()))
        }
        Command::Collect {
            inventory,
            facts,
            topology,
            target,
            output,
            journal,
            dry_run,
        } => {
            let inputs = CollectInputs {
                inventory,
                facts,
                topology,
            };
            let live = commands::run_collect(&config, &inputs)
                .await
                .context("collection failed")?;
            print!("{}", render_collect(&live.report));

            let options = SyncOptions {
                target,
                output,
                journal,
                dry_run,
            };
            let outcome = commands::sync_store(&config, &live.store, &options).context("sync failed")?;
            print_sync(&outcome);
            Ok(exit_code(outcome.is_clean() && live.report.failed.is_empty()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.logging)?;

    info!("--- Starting netsync ---");
    match run(args, config).await {
        Ok(code) => Ok(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "netsync failed");
            Err(e)
        }
    }
}
