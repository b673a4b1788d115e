//! Freezes one bucket directory into the archive.
//!
//! ```bash
//! shuttl-freeze <INDEX> <PATH>
//! ```

#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use shuttl_cli::config::{ArchiverArgs, load_dotenv, log_build_info};
use shuttl_cli::{ExitStatus, TRACING_TARGET_STARTUP, telemetry};

/// Freeze one bucket into the archive.
#[derive(Debug, Parser)]
#[command(name = "shuttl-freeze")]
#[command(about = "Freeze one indexer bucket into the archive")]
#[command(version)]
struct FreezeCli {
    /// Index the bucket belongs to.
    index: Option<String>,

    /// Bucket directory to freeze.
    path: Option<PathBuf>,

    #[clap(flatten)]
    args: ArchiverArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    load_dotenv();
    run().await.into()
}

/// A parsed freeze request.
#[derive(Debug)]
struct FreezeRequest {
    index: String,
    path: PathBuf,
    args: ArchiverArgs,
}

/// Returns true if `argv` carries both positional arguments, whatever else
/// is wrong with it.
fn has_positionals(argv: &[OsString]) -> bool {
    FreezeCli::command()
        .ignore_errors(true)
        .try_get_matches_from(argv)
        .is_ok_and(|matches| {
            matches.get_raw("index").is_some() && matches.get_raw("path").is_some()
        })
}

/// Parses the command line, reporting usage problems.
///
/// A wrong number of positional arguments is reported as such even when
/// options are missing or malformed as well.
fn parse<I, T>(argv: I) -> Result<FreezeRequest, ExitStatus>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();

    let cli = FreezeCli::try_parse_from(&argv).map_err(|err| {
        let mut status = ExitStatus::from_clap_error(&err);
        if status == ExitStatus::InitializationFailed && !has_positionals(&argv) {
            status = ExitStatus::InvalidArguments;
        }

        if status != ExitStatus::Success {
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                kind = ?err.kind(),
                exit_code = status.code(),
                "Invalid command line"
            );
        }
        let _ = err.print();
        status
    })?;

    match (cli.index, cli.path) {
        (Some(index), Some(path)) => Ok(FreezeRequest {
            index,
            path,
            args: cli.args,
        }),
        (index, path) => {
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                index = ?index,
                path = ?path,
                exit_code = ExitStatus::InvalidArguments.code(),
                "Expected exactly two arguments: <INDEX> <PATH>"
            );
            Err(ExitStatus::InvalidArguments)
        }
    }
}

async fn run() -> ExitStatus {
    if let Err(err) = telemetry::init_tracing() {
        eprintln!("Error: {err:#}");
        return ExitStatus::InitializationFailed;
    }

    let FreezeRequest { index, path, args } = match parse(std::env::args_os()) {
        Ok(request) => request,
        Err(status) => return status,
    };
    log_build_info("shuttl-freeze");

    let state = match args.build_state() {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                error = format!("{err:#}"),
                "Failed to initialize archiver"
            );
            return ExitStatus::InitializationFailed;
        }
    };

    match state.freezer.freeze_bucket(&index, &path).await {
        Ok(outcome) => {
            tracing::info!(
                target: TRACING_TARGET_STARTUP,
                index = %index,
                path = %path.display(),
                outcome = outcome.as_ref(),
                "Freeze finished"
            );
            ExitStatus::Success
        }
        Err(err) => {
            let status = ExitStatus::from_error(&err);
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                index = %index,
                path = %path.display(),
                error = %err,
                exit_code = status.code(),
                "Freeze failed"
            );
            status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: [&str; 8] = [
        "--local-root",
        "/opt/shuttl",
        "--archive-root",
        "/mnt/archive",
        "--cluster-name",
        "idx",
        "--server-name",
        "idx-1",
    ];

    fn argv(extra: &[&str]) -> Vec<String> {
        std::iter::once("shuttl-freeze")
            .chain(OPTIONS)
            .chain(extra.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_two_arguments() {
        let request = parse(argv(&["main", "/hot/db_2_1_0"])).unwrap();
        assert_eq!(request.index, "main");
        assert_eq!(request.path, PathBuf::from("/hot/db_2_1_0"));
    }

    #[test]
    fn test_wrong_argument_count() {
        assert_eq!(parse(argv(&["main"])).unwrap_err(), ExitStatus::InvalidArguments);
        assert_eq!(
            parse(argv(&["main", "/hot/a", "/hot/b"])).unwrap_err(),
            ExitStatus::InvalidArguments
        );
        assert_eq!(
            parse(argv(&["--bogus", "main", "/hot/a"])).unwrap_err(),
            ExitStatus::InvalidArguments
        );
    }

    #[test]
    fn test_argument_count_checked_before_options() {
        assert_eq!(
            parse(["shuttl-freeze", "main"]).unwrap_err(),
            ExitStatus::InvalidArguments
        );
        assert_eq!(parse(["shuttl-freeze"]).unwrap_err(), ExitStatus::InvalidArguments);
        assert_eq!(
            parse(["shuttl-freeze", "main", "/hot/a"]).unwrap_err(),
            ExitStatus::InitializationFailed
        );
        assert_eq!(
            parse(["shuttl-freeze", "--lock-lease-secs", "soon", "main"]).unwrap_err(),
            ExitStatus::InvalidArguments
        );
    }

    #[test]
    fn test_help_and_bad_values() {
        assert_eq!(parse(["shuttl-freeze", "--help"]).unwrap_err(), ExitStatus::Success);
        assert_eq!(
            parse(argv(&["--lock-lease-secs", "soon", "main", "/hot/a"])).unwrap_err(),
            ExitStatus::InitializationFailed
        );
    }
}
