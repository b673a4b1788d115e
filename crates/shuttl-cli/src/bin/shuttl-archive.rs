//! Lists, thaws and recovers archived buckets.

#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;
use serde::Serialize;
use shuttl_cli::config::{ArchiverArgs, load_dotenv, log_build_info, parse_timestamp};
use shuttl_cli::{TRACING_TARGET_STARTUP, telemetry};

/// Inspect and restore the bucket archive.
#[derive(Debug, Parser)]
#[command(name = "shuttl-archive")]
#[command(about = "List, thaw and recover archived indexer buckets")]
#[command(version)]
struct ArchiveCli {
    #[clap(flatten)]
    args: ArchiverArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the archived indexes.
    ListIndexes,
    /// List archived buckets, one per bucket in the preferred format.
    ListBuckets(Selection),
    /// Restore archived buckets into the thaw directory.
    Thaw(Selection),
    /// Archive buckets left in staging by failed freezes.
    Recover,
}

/// Which buckets a command applies to.
#[derive(Debug, Args)]
struct Selection {
    /// Only buckets of this index.
    #[arg(long)]
    index: Option<String>,

    /// Only buckets with events at or after this time.
    #[arg(long, value_parser = parse_timestamp)]
    from: Option<Timestamp>,

    /// Only buckets with events at or before this time.
    #[arg(long, value_parser = parse_timestamp)]
    to: Option<Timestamp>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    load_dotenv();
    let cli = ArchiveCli::parse();

    let Err(error) = run(cli).await else {
        return ExitCode::SUCCESS;
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            error = format!("{error:#}"),
            "Command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }
    ExitCode::FAILURE
}

async fn run(cli: ArchiveCli) -> anyhow::Result<()> {
    telemetry::init_tracing()?;
    log_build_info("shuttl-archive");
    let state = cli.args.build_state()?;

    match cli.command {
        Command::ListIndexes => print_json(&state.listing.list_indexes().await?),
        Command::ListBuckets(selection) => print_json(
            &state
                .listing
                .list_buckets(selection.index.as_deref(), selection.from, selection.to)
                .await?,
        ),
        Command::Thaw(selection) => print_json(
            &state
                .thaw
                .thaw_buckets(selection.index.as_deref(), selection.from, selection.to)
                .await?,
        ),
        Command::Recover => print_json(&state.recovery.archive_failed_buckets().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
