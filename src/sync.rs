//! Release synchronisation across SDK targets.
//!
//! A run fetches the checksum manifest once, then walks the targets in
//! configuration order. Each target moves through
//! `Init -> LedgerMerged -> Patching(i) -> Done | Failed`; a failure stops
//! that target only, and the run carries on with the next one.

use crate::config::{SdkTarget, SyncConfig};
use crate::fetch::{FetchError, ManifestFetcher, manifest_url};
use crate::ledger::{self, LedgerError, MergeOutcome};
use crate::manifest::{ChecksumManifest, ManifestParseError, parse_manifest};
use crate::output::write_stderr_line;
use crate::patch::{PatchError, PatchOutcome, patch_version};
use crate::version_tag::VersionTag;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, error};
use std::io::Write;

/// Errors that end a run before any target is touched.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The checksum manifest could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The downloaded manifest held no checksum entries.
    #[error("no checksums could be parsed from the downloaded checksums file: {0}")]
    Parse(#[from] ManifestParseError),
}

/// Step at which a target failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Merging the checksum ledger.
    Ledger,
    /// Rewriting a pinned version.
    Patch,
}

/// Why a target could not be brought up to date.
#[derive(Debug, thiserror::Error)]
pub enum TargetFailure {
    /// The ledger could not be merged; no source file was touched.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A source file could not be patched; later files were not touched.
    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl TargetFailure {
    /// Step at which the failure occurred.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Ledger(_) => Stage::Ledger,
            Self::Patch(_) => Stage::Patch,
        }
    }
}

/// Outcome of patching one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Patched file.
    pub path: Utf8PathBuf,
    /// What happened to it.
    pub outcome: PatchOutcome,
}

/// Final state of a target.
#[derive(Debug)]
pub enum TargetStatus {
    /// The ledger and every file were handled.
    Done,
    /// The target stopped at the recorded failure.
    Failed(TargetFailure),
}

/// Everything that happened to one target.
#[derive(Debug)]
pub struct TargetReport {
    /// Target display name.
    pub name: String,
    /// Ledger merge result, if the merge succeeded.
    pub ledger: Option<MergeOutcome>,
    /// Files handled before the target finished or failed.
    pub files: Vec<FileReport>,
    /// Final state.
    pub status: TargetStatus,
}

impl TargetReport {
    /// Returns true when the target did not complete.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TargetStatus::Failed(_))
    }
}

/// Aggregate verdict of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every target completed.
    AllSucceeded,
    /// The named targets failed, in processing order.
    PartialFailure(Vec<String>),
}

/// Per-target results of a run.
#[derive(Debug)]
pub struct RunReport {
    version: VersionTag,
    targets: Vec<TargetReport>,
}

impl RunReport {
    /// Version that was synchronised.
    #[must_use]
    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    /// Target reports in processing order.
    #[must_use]
    pub fn targets(&self) -> &[TargetReport] {
        &self.targets
    }

    /// Summarise the run.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        let failed: Vec<String> = self
            .targets
            .iter()
            .filter(|target| target.is_failed())
            .map(|target| target.name.clone())
            .collect();
        if failed.is_empty() {
            RunOutcome::AllSucceeded
        } else {
            RunOutcome::PartialFailure(failed)
        }
    }
}

/// Per-target progress. `Done` and `Failed` are terminal.
#[derive(Debug)]
enum TargetState {
    Init,
    LedgerMerged,
    Patching(usize),
    Done,
    Failed(TargetFailure),
}

/// Drives a release through every configured SDK.
///
/// # Examples
///
/// ```no_run
/// use sdk_checksum_sync::config::SyncConfig;
/// use sdk_checksum_sync::fetch::HttpFetcher;
/// use sdk_checksum_sync::sync::{RunOutcome, Synchronizer};
/// use sdk_checksum_sync::version_tag::VersionTag;
///
/// let config = SyncConfig::default();
/// let fetcher = HttpFetcher::new(config.fetch_timeout());
/// let tag = VersionTag::try_from("v0.2.8").expect("valid tag");
///
/// let report = Synchronizer::new(config)
///     .run(&tag, &fetcher, &mut std::io::stderr())
///     .expect("manifest fetched");
/// assert_eq!(report.outcome(), RunOutcome::AllSucceeded);
/// ```
#[derive(Debug, Clone)]
pub struct Synchronizer {
    config: SyncConfig,
}

impl Synchronizer {
    /// Create a synchroniser for `config`.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Settings this synchroniser runs with.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch the manifest for `version` and update every target.
    ///
    /// Progress is written to `out`. Target failures are recorded in the
    /// returned report rather than returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the manifest cannot be fetched or parsed.
    /// No target is touched in that case.
    pub fn run(
        &self,
        version: &VersionTag,
        fetcher: &dyn ManifestFetcher,
        out: &mut dyn Write,
    ) -> Result<RunReport, SyncError> {
        write_stderr_line(out, format!("Fetching checksums for version {version}"));
        write_stderr_line(
            out,
            format!(
                "Downloading checksums file from {}...",
                manifest_url(&self.config.project, version)
            ),
        );
        let text = fetcher.fetch_manifest(&self.config.project, version)?;
        let manifest = parse_manifest(&text)?;
        debug!("parsed {} checksum entries", manifest.len());

        let targets = self
            .config
            .targets()
            .iter()
            .map(|target| self.sync_target(target, version, &manifest, out))
            .collect();

        Ok(RunReport {
            version: version.clone(),
            targets,
        })
    }

    fn sync_target(
        &self,
        target: &SdkTarget,
        version: &VersionTag,
        manifest: &ChecksumManifest,
        out: &mut dyn Write,
    ) -> TargetReport {
        write_stderr_line(out, format!("\n--- Updating {} SDK ---", target.name));

        let mut ledger_outcome = None;
        let mut files = Vec::with_capacity(target.files.len());
        let mut state = TargetState::Init;

        let status = loop {
            state = match state {
                TargetState::Init => match ledger::merge(
                    &target.ledger_path,
                    version.as_str(),
                    manifest,
                    self.config.ledger_policy(),
                ) {
                    Ok(outcome) => {
                        if outcome.recovered_from_corrupt() {
                            write_stderr_line(
                                out,
                                format!(
                                    "Warning: could not parse existing {}, overwrote it.",
                                    target.ledger_path
                                ),
                            );
                        }
                        write_stderr_line(
                            out,
                            format!(
                                "Updated {} with checksums for version {version}.",
                                target.ledger_path
                            ),
                        );
                        ledger_outcome = Some(outcome);
                        TargetState::LedgerMerged
                    }
                    Err(err) => TargetState::Failed(err.into()),
                },
                TargetState::LedgerMerged => TargetState::Patching(0),
                TargetState::Patching(index) => match target.files.get(index) {
                    None => TargetState::Done,
                    Some(path) => {
                        match patch_version(path, version.as_str(), &target.identifier) {
                            Ok(outcome) => {
                                write_stderr_line(
                                    out,
                                    describe_patch(path, &target.identifier, version, outcome),
                                );
                                files.push(FileReport {
                                    path: path.clone(),
                                    outcome,
                                });
                                TargetState::Patching(index + 1)
                            }
                            Err(err) => TargetState::Failed(err.into()),
                        }
                    }
                },
                TargetState::Done => break TargetStatus::Done,
                TargetState::Failed(failure) => {
                    error!("failed to update {} SDK: {failure}", target.name);
                    write_stderr_line(
                        out,
                        format!("Error updating {} SDK: {failure}", target.name),
                    );
                    break TargetStatus::Failed(failure);
                }
            };
        };

        TargetReport {
            name: target.name.clone(),
            ledger: ledger_outcome,
            files,
            status,
        }
    }
}

fn describe_patch(
    path: &Utf8Path,
    identifier: &str,
    version: &VersionTag,
    outcome: PatchOutcome,
) -> String {
    match outcome {
        PatchOutcome::Patched { .. } => format!("Updated {identifier} in {path} to {version}."),
        PatchOutcome::SkippedIdentifierNotFound => {
            format!("Note: did not find '{identifier}' in {path}, skipping update for this file.")
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
