//! Artefact verification against a checksum ledger.
//!
//! SDK installers hash the archive they download and compare the digest with
//! `ledger[version][archive file name]`. This module performs the same check
//! so a release can be validated before the SDKs ship.

use crate::ledger::{self, LedgerError, LedgerState};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;

/// Errors arising while verifying an artefact.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// No ledger exists at the given path.
    #[error("checksum ledger {path} does not exist")]
    LedgerMissing {
        /// Ledger path.
        path: Utf8PathBuf,
    },

    /// The ledger exists but cannot be parsed.
    #[error("checksum ledger {path} is corrupt: {reason}")]
    LedgerCorrupt {
        /// Ledger path.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The ledger has no entry for the requested version.
    #[error("checksum ledger {path} has no entry for version {version}")]
    VersionNotFound {
        /// Ledger path.
        path: Utf8PathBuf,
        /// Requested version.
        version: String,
    },

    /// The version entry does not list the artefact.
    #[error("no checksum recorded for {artefact} in version {version}")]
    ArtifactNotListed {
        /// Artefact file name.
        artefact: String,
        /// Requested version.
        version: String,
    },

    /// The artefact's digest differs from the recorded checksum.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Checksum recorded in the ledger.
        expected: String,
        /// Digest computed from the file.
        actual: String,
    },

    /// Reading the ledger or the artefact failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be opened or read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String, VerifyError> {
    let io_error = |source| VerifyError::Io {
        path: path.to_owned(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_error)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check the artefact at `artefact_path` against the checksum recorded for
/// `version` in the ledger at `ledger_path`.
///
/// The artefact is looked up by its file name, as the installers do.
///
/// # Errors
///
/// Returns [`VerifyError`] when the ledger is missing or corrupt, when it
/// records no checksum for the artefact, or when the digests differ.
pub fn verify_artifact(
    ledger_path: &Utf8Path,
    version: &str,
    artefact_path: &Utf8Path,
) -> Result<(), VerifyError> {
    let ledger = match ledger::load(ledger_path) {
        Ok(LedgerState::Loaded(ledger)) => ledger,
        Ok(LedgerState::Absent) => {
            return Err(VerifyError::LedgerMissing {
                path: ledger_path.to_owned(),
            });
        }
        Ok(LedgerState::Corrupt { reason }) => {
            return Err(VerifyError::LedgerCorrupt {
                path: ledger_path.to_owned(),
                reason,
            });
        }
        Err(LedgerError::Read { path, source }) => return Err(VerifyError::Io { path, source }),
        Err(other) => {
            return Err(VerifyError::LedgerCorrupt {
                path: ledger_path.to_owned(),
                reason: other.to_string(),
            });
        }
    };

    let manifest = ledger
        .manifest_for(version)
        .ok_or_else(|| VerifyError::VersionNotFound {
            path: ledger_path.to_owned(),
            version: version.to_owned(),
        })?;

    let artefact = artefact_path.file_name().unwrap_or(artefact_path.as_str());
    let expected = manifest
        .checksum_for(artefact)
        .ok_or_else(|| VerifyError::ArtifactNotListed {
            artefact: artefact.to_owned(),
            version: version.to_owned(),
        })?;

    let actual = compute_sha256(artefact_path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(VerifyError::ChecksumMismatch {
            path: artefact_path.to_owned(),
            expected: expected.to_owned(),
            actual,
        });
    }

    debug!("{artefact_path} matches {version} checksum {actual}");
    Ok(())
}
