//! Synchronisation settings.
//!
//! `SyncConfig` names the release project and the SDK directories that pin
//! it. Settings are read from TOML; when no file is given the built-in
//! defaults describe the test-server SDKs:
//!
//! ```toml
//! root = "."
//! strict_ledger = false
//! fetch_timeout_secs = 60
//!
//! [project]
//! owner = "google"
//! repo = "test-server"
//! name = "test-server"
//!
//! [[sdk]]
//! name = "TypeScript"
//! dir = "sdks/typescript"
//! files = ["postinstall.js"]
//! ```

use crate::ledger::CorruptLedgerPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

/// Ledger file name used when an SDK entry does not name one.
pub const DEFAULT_LEDGER_FILE: &str = "checksums.json";

/// Identifier rewritten when an SDK entry does not name one.
pub const DEFAULT_IDENTIFIER: &str = "TEST_SERVER_VERSION";

/// GitHub release coordinates of the project whose checksums are synced.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Project {
    /// Repository owner, e.g. `google`.
    pub owner: String,
    /// Repository name, e.g. `test-server`.
    pub repo: String,
    /// Project name used as the checksum asset prefix.
    pub name: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            owner: "google".to_owned(),
            repo: "test-server".to_owned(),
            name: "test-server".to_owned(),
        }
    }
}

/// One SDK directory as written in configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SdkConfig {
    /// Display name used in progress output and failure summaries.
    pub name: String,
    /// SDK directory, relative to the configured root.
    pub dir: Utf8PathBuf,
    /// Ledger file name inside `dir`.
    #[serde(default = "default_ledger")]
    pub ledger: Utf8PathBuf,
    /// Identifier whose quoted value pins the release.
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Source files inside `dir` that declare the identifier.
    pub files: Vec<Utf8PathBuf>,
}

fn default_ledger() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_LEDGER_FILE)
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER.to_owned()
}

impl SdkConfig {
    fn builtin(name: &str, dir: &str, files: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            dir: Utf8PathBuf::from(dir),
            ledger: default_ledger(),
            identifier: default_identifier(),
            files: files.iter().copied().map(Utf8PathBuf::from).collect(),
        }
    }
}

/// Complete synchronisation settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Base directory that SDK paths are resolved against.
    pub root: Utf8PathBuf,
    /// Refuse to overwrite a ledger that cannot be parsed.
    pub strict_ledger: bool,
    /// Overall timeout for the checksum download, in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// Release project coordinates.
    pub project: Project,
    /// SDKs to update, in processing order.
    #[serde(rename = "sdk")]
    pub sdks: Vec<SdkConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            strict_ledger: false,
            fetch_timeout_secs: None,
            project: Project::default(),
            sdks: vec![
                SdkConfig::builtin("TypeScript", "sdks/typescript", &["postinstall.js"]),
                SdkConfig::builtin("Python", "sdks/python/src/test_server_sdk", &["install.py"]),
                SdkConfig::builtin(
                    "Dotnet",
                    "sdks/dotnet",
                    &[
                        "BinaryInstaller.cs",
                        "TestServerSdk.cs",
                        "tools/installer/Program.cs",
                    ],
                ),
            ],
        }
    }
}

/// Errors arising while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Configuration path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for these settings.
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Configuration path.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The settings parsed but describe an unusable run.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

impl SyncConfig {
    /// Load and validate settings from the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, does not parse,
    /// or fails [`Self::validate`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings describe a usable run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no SDK is configured, when an
    /// SDK lacks a name, files or identifier, or when two SDKs share a name.
    ///
    /// # Examples
    ///
    /// ```
    /// use sdk_checksum_sync::config::SyncConfig;
    ///
    /// assert!(SyncConfig::default().validate().is_ok());
    ///
    /// let empty = SyncConfig { sdks: Vec::new(), ..SyncConfig::default() };
    /// assert!(empty.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sdks.is_empty() {
            return Err(invalid("no SDKs configured"));
        }

        let mut seen = BTreeSet::new();
        for sdk in &self.sdks {
            if sdk.name.trim().is_empty() {
                return Err(invalid(format!("SDK in {} has an empty name", sdk.dir)));
            }
            if sdk.files.is_empty() {
                return Err(invalid(format!("SDK {} lists no files", sdk.name)));
            }
            if sdk.identifier.trim().is_empty() {
                return Err(invalid(format!("SDK {} has an empty identifier", sdk.name)));
            }
            if !seen.insert(sdk.name.as_str()) {
                return Err(invalid(format!("SDK name {} is used twice", sdk.name)));
            }
        }
        Ok(())
    }

    /// Policy applied when an existing ledger cannot be parsed.
    #[must_use]
    pub fn ledger_policy(&self) -> CorruptLedgerPolicy {
        if self.strict_ledger {
            CorruptLedgerPolicy::Abort
        } else {
            CorruptLedgerPolicy::Reset
        }
    }

    /// Download timeout, when one is configured.
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve every SDK into concrete paths under [`Self::root`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sdk_checksum_sync::config::SyncConfig;
    ///
    /// let config = SyncConfig { root: "/repo".into(), ..SyncConfig::default() };
    /// let targets = config.targets();
    /// assert_eq!(targets[1].ledger_path, "/repo/sdks/python/src/test_server_sdk/checksums.json");
    /// ```
    #[must_use]
    pub fn targets(&self) -> Vec<SdkTarget> {
        self.sdks
            .iter()
            .map(|sdk| {
                let dir = self.root.join(&sdk.dir);
                SdkTarget {
                    name: sdk.name.clone(),
                    ledger_path: dir.join(&sdk.ledger),
                    files: sdk.files.iter().map(|file| dir.join(file)).collect(),
                    identifier: sdk.identifier.clone(),
                }
            })
            .collect()
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// An SDK resolved to the paths the synchroniser touches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SdkTarget {
    /// Display name.
    pub name: String,
    /// Ledger file to merge checksums into.
    pub ledger_path: Utf8PathBuf,
    /// Source files to patch, in order.
    pub files: Vec<Utf8PathBuf>,
    /// Identifier whose value is rewritten.
    pub identifier: String,
}
