//! Per-SDK checksum history stored as JSON.
//!
//! Each SDK keeps a `checksums.json` file mapping release tags to the
//! checksum manifest published for that release:
//!
//! ```json
//! {
//!   "v0.1.0": {
//!     "test-server_Linux_x86_64.tar.gz": "3b1f..."
//!   }
//! }
//! ```
//!
//! Merging a release only ever replaces the entry for that release. Loading
//! distinguishes a missing ledger from a corrupt one so callers can choose
//! whether lost history should stop a release.

use crate::manifest::ChecksumManifest;
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};

/// Version-keyed checksum history for one SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumLedger(BTreeMap<String, ChecksumManifest>);

impl ChecksumLedger {
    /// Record `manifest` as the complete checksum set for `version`.
    ///
    /// Any manifest previously stored for `version` is replaced wholesale and
    /// returned; other versions are untouched.
    pub fn record(
        &mut self,
        version: impl Into<String>,
        manifest: ChecksumManifest,
    ) -> Option<ChecksumManifest> {
        self.0.insert(version.into(), manifest)
    }

    /// Returns the manifest stored for `version`.
    #[must_use]
    pub fn manifest_for(&self, version: &str) -> Option<&ChecksumManifest> {
        self.0.get(version)
    }

    /// Iterate over the recorded versions in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of versions recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no versions are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the ledger as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialize`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, LedgerError> {
        let mut json =
            serde_json::to_string_pretty(self).map_err(|source| LedgerError::Serialize { source })?;
        json.push('\n');
        Ok(json)
    }
}

/// What was found at a ledger path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerState {
    /// No ledger file exists, or it is empty.
    Absent,
    /// The ledger was read and parsed.
    Loaded(ChecksumLedger),
    /// The file exists but does not hold a ledger.
    Corrupt {
        /// Parser message describing the problem.
        reason: String,
    },
}

/// How [`merge`] treats a ledger that exists but cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptLedgerPolicy {
    /// Discard the unreadable history and start from an empty ledger.
    #[default]
    Reset,
    /// Refuse to write and report the ledger as corrupt.
    Abort,
}

/// Result of a successful [`merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    versions: usize,
    replaced_existing: bool,
    recovered_from_corrupt: bool,
}

impl MergeOutcome {
    /// Number of versions in the ledger after the merge.
    #[must_use]
    pub fn versions(&self) -> usize {
        self.versions
    }

    /// Returns true when the merged version was already present.
    #[must_use]
    pub fn replaced_existing(&self) -> bool {
        self.replaced_existing
    }

    /// Returns true when an unparsable ledger was discarded.
    #[must_use]
    pub fn recovered_from_corrupt(&self) -> bool {
        self.recovered_from_corrupt
    }
}

/// Errors that prevent a ledger from being read or written.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Reading the ledger file failed.
    #[error("failed to read ledger {path}: {source}")]
    Read {
        /// Ledger path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be parsed and the policy forbids resetting it.
    #[error("ledger {path} is corrupt: {reason}")]
    Corrupt {
        /// Ledger path.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Serialising the ledger failed.
    #[error("failed to serialise ledger: {source}")]
    Serialize {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the ledger file failed.
    #[error("failed to write ledger {path}: {source}")]
    Write {
        /// Ledger path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Read the ledger at `path` without modifying it.
///
/// # Errors
///
/// Returns [`LedgerError::Read`] for I/O failures other than the file not
/// existing.
pub fn load(path: &Utf8Path) -> Result<LedgerState, LedgerError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(LedgerState::Absent),
        Err(source) if source.kind() == ErrorKind::InvalidData => {
            return Ok(LedgerState::Corrupt {
                reason: source.to_string(),
            });
        }
        Err(source) => {
            return Err(LedgerError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };

    if content.is_empty() {
        return Ok(LedgerState::Absent);
    }

    Ok(match serde_json::from_str::<ChecksumLedger>(&content) {
        Ok(ledger) => LedgerState::Loaded(ledger),
        Err(err) => LedgerState::Corrupt {
            reason: err.to_string(),
        },
    })
}

/// Merge `manifest` into the ledger at `path` under `version`.
///
/// The ledger is rewritten through a temporary sibling file that replaces
/// the original only once fully written.
///
/// # Errors
///
/// Returns [`LedgerError`] when the ledger cannot be read or written, or
/// when it is corrupt and `policy` is [`CorruptLedgerPolicy::Abort`].
pub fn merge(
    path: &Utf8Path,
    version: &str,
    manifest: &ChecksumManifest,
    policy: CorruptLedgerPolicy,
) -> Result<MergeOutcome, LedgerError> {
    let (mut ledger, recovered_from_corrupt) = match load(path)? {
        LedgerState::Absent => (ChecksumLedger::default(), false),
        LedgerState::Loaded(ledger) => (ledger, false),
        LedgerState::Corrupt { reason } => match policy {
            CorruptLedgerPolicy::Reset => {
                warn!("could not parse existing ledger {path}, starting afresh: {reason}");
                (ChecksumLedger::default(), true)
            }
            CorruptLedgerPolicy::Abort => {
                return Err(LedgerError::Corrupt {
                    path: path.to_owned(),
                    reason,
                });
            }
        },
    };

    let replaced_existing = ledger.record(version, manifest.clone()).is_some();
    persist(path, &ledger)?;
    info!("updated {path} with checksums for {version}");

    Ok(MergeOutcome {
        versions: ledger.len(),
        replaced_existing,
        recovered_from_corrupt,
    })
}

fn persist(path: &Utf8Path, ledger: &ChecksumLedger) -> Result<(), LedgerError> {
    let json = ledger.to_json()?;
    let write_error = |source| LedgerError::Write {
        path: path.to_owned(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    apply_ledger_permissions(path, staged.as_file()).map_err(write_error)?;
    staged.write_all(json.as_bytes()).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged
        .persist(path.as_std_path())
        .map_err(|err| write_error(err.error))?;
    Ok(())
}

/// Keep the permissions of an existing ledger; new ledgers are world-readable.
fn apply_ledger_permissions(path: &Utf8Path, file: &fs::File) -> std::io::Result<()> {
    match fs::metadata(path) {
        Ok(metadata) => file.set_permissions(metadata.permissions()),
        Err(_) => apply_default_permissions(file),
    }
}

#[cfg(unix)]
fn apply_default_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn apply_default_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
