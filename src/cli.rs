//! CLI argument definitions for `update-sdk-checksums`.
//!
//! Defined in the library so the binary stays focused on orchestration and
//! parsing can be tested directly.

use crate::version_tag::VersionTag;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Sync release checksums and pinned versions into the SDKs.
#[derive(Parser, Debug)]
#[command(name = "update-sdk-checksums")]
#[command(version, about)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
#[command(long_about = concat!(
    "Sync release checksums and pinned versions into the SDKs.\n\n",
    "Downloads the checksums file published with a release, records it in each ",
    "SDK's checksums.json, and rewrites the version constant in each SDK's ",
    "installer sources. Every SDK is attempted; failures are summarised at the end.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Update the built-in SDKs to a release:\n",
    "    $ update-sdk-checksums v0.2.8\n\n",
    "  Preview the targets for a custom configuration:\n",
    "    $ update-sdk-checksums --config sync.toml --dry-run v0.2.8\n\n",
    "  Check downloaded archives against a ledger:\n",
    "    $ update-sdk-checksums verify --ledger sdks/python/src/test_server_sdk/checksums.json \\\n",
    "        --version v0.2.8 test-server_Linux_x86_64.tar.gz",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Sync arguments (used when no subcommand is given).
    #[command(flatten)]
    pub sync: SyncArgs,
}

impl Cli {
    /// Arguments of the sync run, whether given directly or via `sync`.
    ///
    /// Returns `None` for other subcommands.
    #[must_use]
    pub fn sync_args(&self) -> Option<&SyncArgs> {
        match &self.command {
            None => Some(&self.sync),
            Some(Command::Sync(args)) => Some(args),
            Some(Command::Verify(_)) => None,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Update ledgers and pinned versions (default when no subcommand given).
    Sync(SyncArgs),

    /// Verify downloaded artefacts against a checksum ledger.
    Verify(VerifyArgs),
}

/// Arguments for the sync command.
#[derive(Parser, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Release tag to sync, e.g. v0.2.8.
    #[arg(value_name = "VERSION_TAG", required = true)]
    pub tag: Option<VersionTag>,

    /// TOML file describing the project and SDKs [default: built-in SDKs].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory SDK paths are resolved against, overriding the config.
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Fail an SDK instead of overwriting a ledger that cannot be parsed.
    #[arg(long)]
    pub strict_ledger: bool,

    /// Show the manifest URL and targets, then exit without changes.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (the failure summary is still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    /// Checksum ledger to verify against.
    #[arg(long, value_name = "FILE")]
    pub ledger: Utf8PathBuf,

    /// Release tag whose checksums apply.
    #[arg(long = "version", value_name = "TAG")]
    pub release: VersionTag,

    /// Artefacts to check; each is looked up by file name.
    #[arg(value_name = "ARTIFACT", required = true)]
    pub artefacts: Vec<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
