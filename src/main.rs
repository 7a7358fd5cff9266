//! `update-sdk-checksums` CLI entrypoint.
//!
//! Syncs a release's checksums and pinned version into every configured SDK,
//! or verifies downloaded artefacts against a ledger.

use clap::Parser;
use sdk_checksum_sync::cli::{Cli, Command, SyncArgs, VerifyArgs};
use sdk_checksum_sync::config::SyncConfig;
use sdk_checksum_sync::error::{AppError, Result};
use sdk_checksum_sync::fetch::{HttpFetcher, ManifestFetcher, manifest_url};
use sdk_checksum_sync::output::{DryRunInfo, success_message, write_stderr_line};
use sdk_checksum_sync::sync::{RunOutcome, Synchronizer};
use sdk_checksum_sync::verify::verify_artifact;
use sdk_checksum_sync::version_tag::VersionTag;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    let cli = Cli::parse();
    let mut stderr = io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Route `log` records to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed; keep it.
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Some(Command::Verify(args)) => run_verify(args, stderr),
        Some(Command::Sync(args)) => run_sync(args, stderr),
        None => run_sync(&cli.sync, stderr),
    }
}

fn resolve_config(args: &SyncArgs) -> Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(root) = &args.root {
        config.root.clone_from(root);
    }
    if args.strict_ledger {
        config.strict_ledger = true;
    }
    config.validate()?;
    Ok(config)
}

fn run_sync(args: &SyncArgs, stderr: &mut dyn Write) -> Result<()> {
    let Some(tag) = &args.tag else {
        return Err(AppError::MissingTag);
    };
    let config = resolve_config(args)?;

    if args.dry_run {
        let url = manifest_url(&config.project, tag);
        let targets = config.targets();
        let info = DryRunInfo {
            version: tag.as_str(),
            url: &url,
            policy: config.ledger_policy(),
            targets: &targets,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let fetcher = HttpFetcher::new(config.fetch_timeout());
    sync_with(config, tag, &fetcher, args.quiet, stderr)
}

fn sync_with(
    config: SyncConfig,
    tag: &VersionTag,
    fetcher: &dyn ManifestFetcher,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let sdk_count = config.sdks.len();
    let synchronizer = Synchronizer::new(config);

    let mut sink = io::sink();
    let progress: &mut dyn Write = if quiet { &mut sink } else { &mut *stderr };
    let report = synchronizer.run(tag, fetcher, progress)?;

    match report.outcome() {
        RunOutcome::AllSucceeded => {
            if !quiet {
                write_stderr_line(stderr, "");
                write_stderr_line(stderr, success_message(tag.as_str(), sdk_count));
            }
            Ok(())
        }
        RunOutcome::PartialFailure(failed) => Err(AppError::PartialFailure { failed }),
    }
}

fn run_verify(args: &VerifyArgs, stderr: &mut dyn Write) -> Result<()> {
    let mut failures = Vec::new();
    for artefact in &args.artefacts {
        match verify_artifact(&args.ledger, args.release.as_str(), artefact) {
            Ok(()) => write_stderr_line(stderr, format!("{artefact}: OK")),
            Err(err) => {
                write_stderr_line(stderr, format!("{artefact}: FAILED ({err})"));
                failures.push(err);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(AppError::Verify {
            failures,
            total: args.artefacts.len(),
        })
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, &err);
            err.exit_code()
        }
    }
}
