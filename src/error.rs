//! Error types for the checksum sync CLI.
//!
//! Module errors stay close to the code that raises them; `AppError` is the
//! single type the binary reports, and every variant maps to a non-zero exit
//! status.

use crate::config::ConfigError;
use crate::output::partial_failure_message;
use crate::sync::SyncError;
use crate::verify::VerifyError;
use thiserror::Error;

/// Errors that end a CLI invocation unsuccessfully.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run stopped before any SDK was updated.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A sync run was started without a release tag.
    ///
    /// The command line rejects a missing tag as a usage error before this
    /// point, so this is only raised for `SyncArgs` built in code, whose
    /// `tag` is optional to let subcommands share the flattened arguments.
    #[error("a version tag such as v0.1.0 is required")]
    MissingTag,

    /// Some SDKs failed while others were updated.
    #[error("{}", partial_failure_message(.failed))]
    PartialFailure {
        /// Names of the failed SDKs, in processing order.
        failed: Vec<String>,
    },

    /// One or more artefacts failed verification.
    #[error("{} of {total} artefacts failed verification", .failures.len())]
    Verify {
        /// Each failed verification, in argument order.
        failures: Vec<VerifyError>,
        /// Number of artefacts checked.
        total: usize,
    },
}

impl AppError {
    /// Process exit status for this error.
    ///
    /// Usage errors are reported by clap with status 2; every failure raised
    /// after argument parsing exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Convenience type alias for CLI results.
pub type Result<T> = std::result::Result<T, AppError>;
