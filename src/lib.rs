//! SDK checksum synchronisation library.
//!
//! This crate keeps SDK packages in step with a tagged release: it downloads
//! the release's `checksums.txt`, records it in each SDK's `checksums.json`
//! ledger, and rewrites the version constant pinned in each SDK's installer
//! sources. It backs the `update-sdk-checksums` binary and can be driven
//! programmatically with a custom [`fetch::ManifestFetcher`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Project and SDK settings loaded from TOML
//! - [`error`] - CLI error type and exit status mapping
//! - [`fetch`] - Checksum manifest download
//! - [`ledger`] - Version-keyed checksum history files
//! - [`manifest`] - `checksums.txt` parsing
//! - [`output`] - Progress and summary messages
//! - [`patch`] - In-place rewriting of pinned version literals
//! - [`sync`] - Per-SDK synchronisation run
//! - [`verify`] - Artefact verification against a ledger
//! - [`version_tag`] - Validated release tags

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod manifest;
pub mod output;
pub mod patch;
pub mod sync;
pub mod verify;
pub mod version_tag;
