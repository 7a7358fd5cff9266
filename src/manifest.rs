//! Checksum manifest parsing.
//!
//! Release pipelines publish a plain-text `checksums.txt` alongside every
//! tagged release. Each line pairs a hex digest with an archive filename,
//! digest first:
//!
//! ```text
//! 3b1f...c2  test-server_Linux_x86_64.tar.gz
//! 9ad0...71  test-server_Windows_x86_64.zip
//! ```
//!
//! [`parse_manifest`] turns that text into a [`ChecksumManifest`]. Lines that
//! do not have exactly two fields are tolerated and skipped, but a manifest
//! that yields no entries at all is rejected.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Mapping from artefact filename to checksum for a single release.
///
/// Entries are ordered by filename so that serialised ledgers are stable
/// across runs.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::manifest::ChecksumManifest;
///
/// let mut manifest = ChecksumManifest::default();
/// manifest.insert("server.tar.gz", "abc123");
/// assert_eq!(manifest.checksum_for("server.tar.gz"), Some("abc123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumManifest(BTreeMap<String, String>);

impl ChecksumManifest {
    /// Insert or replace the checksum for `artefact`.
    ///
    /// Returns the previous checksum when the filename was already present.
    pub fn insert(
        &mut self,
        artefact: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(artefact.into(), checksum.into())
    }

    /// Look up the checksum recorded for `artefact`.
    #[must_use]
    pub fn checksum_for(&self, artefact: &str) -> Option<&str> {
        self.0.get(artefact).map(String::as_str)
    }

    /// Number of artefacts listed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no artefacts are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(artefact, checksum)` pairs in filename order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, sum)| (name.as_str(), sum.as_str()))
    }
}

impl<'a> IntoIterator for &'a ChecksumManifest {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<A, C> FromIterator<(A, C)> for ChecksumManifest
where
    A: Into<String>,
    C: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(artefact, checksum)| (artefact.into(), checksum.into()))
                .collect(),
        )
    }
}

/// Errors arising from manifest parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestParseError {
    /// No line of the manifest produced a usable entry.
    #[error("empty or malformed manifest")]
    EmptyOrMalformed,
}

/// Parse `checksums.txt` content into a [`ChecksumManifest`].
///
/// Blank lines are ignored, as are lines that do not split into exactly two
/// whitespace-separated fields. When a filename is listed more than once the
/// last line wins.
///
/// # Errors
///
/// Returns [`ManifestParseError::EmptyOrMalformed`] when no entries could be
/// extracted.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::manifest::parse_manifest;
///
/// let text = "abc123  server_Linux_x86_64.tar.gz\n\ndef456  server_Windows_x86_64.zip\n";
/// let manifest = parse_manifest(text).expect("valid manifest");
/// assert_eq!(manifest.len(), 2);
/// assert_eq!(manifest.checksum_for("server_Windows_x86_64.zip"), Some("def456"));
///
/// assert!(parse_manifest("").is_err());
/// ```
pub fn parse_manifest(text: &str) -> Result<ChecksumManifest, ManifestParseError> {
    let mut manifest = ChecksumManifest::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(checksum), Some(artefact), None) => {
                if let Some(previous) = manifest.insert(artefact, checksum) {
                    debug!("manifest line {}: {artefact} relisted, replacing {previous}", index + 1);
                }
            }
            _ => debug!("manifest line {}: ignoring unrecognised line", index + 1),
        }
    }

    if manifest.is_empty() {
        return Err(ManifestParseError::EmptyOrMalformed);
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LINUX_SUM: &str = "3b1f0c7a9e2d4b6f8a0c1e3d5f7b9a1c3e5d7f9b1a3c5e7d9f1b3a5c7e9d1f3b";
    const WINDOWS_SUM: &str = "9ad07c1e3b5d7f9a1c3e5b7d9f1a3c5e7b9d1f3a5c7e9b1d3f5a7c9e1b3d5f71";

    #[test]
    fn parses_checksum_then_filename() {
        let text = format!(
            "{LINUX_SUM}  test-server_Linux_x86_64.tar.gz\n{WINDOWS_SUM}  test-server_Windows_x86_64.zip\n"
        );
        let manifest = parse_manifest(&text).expect("valid manifest");

        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.checksum_for("test-server_Linux_x86_64.tar.gz"),
            Some(LINUX_SUM)
        );
        assert_eq!(
            manifest.checksum_for("test-server_Windows_x86_64.zip"),
            Some(WINDOWS_SUM)
        );
    }

    #[test]
    fn ignores_blank_and_odd_lines() {
        let text = concat!(
            "\n",
            "   \n",
            "abc123  server.tar.gz\n",
            "# generated by the release pipeline\n",
            "lonely-token\n",
            "one two three\n",
            "\t def456\tserver.zip  \n",
        );
        let manifest = parse_manifest(text).expect("valid manifest");

        let entries: Vec<_> = manifest.iter().collect();
        assert_eq!(
            entries,
            vec![("server.tar.gz", "abc123"), ("server.zip", "def456")]
        );
    }

    #[test]
    fn last_listing_of_a_filename_wins() {
        let text = "aaa  server.tar.gz\nbbb  server.tar.gz\n";
        let manifest = parse_manifest(text).expect("valid manifest");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.checksum_for("server.tar.gz"), Some("bbb"));
    }

    #[test]
    fn accepts_windows_line_endings() {
        let manifest = parse_manifest("abc  a.zip\r\ndef  b.zip\r\n").expect("valid manifest");
        assert_eq!(manifest.checksum_for("b.zip"), Some("def"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace_only("  \n\t\n")]
    #[case::garbage("garbage\n")]
    #[case::too_many_fields("a b c\nd e f g\n")]
    fn rejects_manifests_without_entries(#[case] text: &str) {
        assert_eq!(
            parse_manifest(text),
            Err(ManifestParseError::EmptyOrMalformed)
        );
    }

    #[test]
    fn error_message_is_stable() {
        assert_eq!(
            ManifestParseError::EmptyOrMalformed.to_string(),
            "empty or malformed manifest"
        );
    }

    #[test]
    fn serialises_as_a_flat_object() {
        let manifest: ChecksumManifest = [("b.zip", "2"), ("a.tar.gz", "1")].into_iter().collect();
        let json = serde_json::to_string(&manifest).expect("serialise");
        assert_eq!(json, r#"{"a.tar.gz":"1","b.zip":"2"}"#);
    }
}
