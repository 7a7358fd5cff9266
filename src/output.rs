//! Human-readable messages for the sync CLI.
//!
//! Progress and summaries are written to an injected writer rather than
//! straight to stderr so callers and tests decide where they go.

use crate::config::SdkTarget;
use crate::ledger::CorruptLedgerPolicy;
use std::io::Write;

/// Write `message` followed by a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the closing message of a fully successful run.
///
/// # Example
///
/// ```
/// use sdk_checksum_sync::output::success_message;
///
/// assert!(success_message("v0.1.0", 3).contains("3 SDKs"));
/// ```
#[must_use]
pub fn success_message(version: &str, sdk_count: usize) -> String {
    let plural = if sdk_count == 1 { "SDK" } else { "SDKs" };
    format!(
        "Successfully updated checksums and versions to {version} for {sdk_count} {plural}. \
         Review the changes, then commit them to your repository."
    )
}

/// Format the closing message of a run in which some SDKs failed.
///
/// # Example
///
/// ```
/// use sdk_checksum_sync::output::partial_failure_message;
///
/// let names = vec!["Python".to_owned()];
/// assert_eq!(partial_failure_message(&names), "Failed to update SDKs: Python");
/// ```
#[must_use]
pub fn partial_failure_message(failed: &[String]) -> String {
    format!("Failed to update SDKs: {}", failed.join(", "))
}

/// Everything a dry run reports.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Version being synchronised.
    pub version: &'a str,
    /// Checksum manifest URL that would be fetched.
    pub url: &'a str,
    /// Policy applied to unparsable ledgers.
    pub policy: CorruptLedgerPolicy,
    /// Resolved SDK targets, in processing order.
    pub targets: &'a [SdkTarget],
}

impl DryRunInfo<'_> {
    /// Format the dry-run report for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let policy = match self.policy {
            CorruptLedgerPolicy::Reset => "reset",
            CorruptLedgerPolicy::Abort => "abort",
        };
        let mut text = format!(
            "Dry run - no files will be modified\n\n\
             Version:        {}\n\
             Manifest URL:   {}\n\
             Corrupt ledger: {policy}\n",
            self.version, self.url
        );
        for target in self.targets {
            text.push_str(&format!(
                "\n{}:\n  ledger: {}\n  identifier: {}\n",
                target.name, target.ledger_path, target.identifier
            ));
            for file in &target.files {
                text.push_str(&format!("  file: {file}\n"));
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use rstest::rstest;

    #[rstest]
    #[case(1, "1 SDK.")]
    #[case(3, "3 SDKs.")]
    fn success_message_pluralises(#[case] count: usize, #[case] expected: &str) {
        assert!(success_message("v0.1.0", count).contains(expected));
    }

    #[test]
    fn partial_failure_lists_names_in_order() {
        let names = vec!["TypeScript".to_owned(), "Dotnet".to_owned()];
        assert_eq!(
            partial_failure_message(&names),
            "Failed to update SDKs: TypeScript, Dotnet"
        );
    }

    #[test]
    fn dry_run_lists_every_target_file() {
        let targets = SyncConfig::default().targets();
        let info = DryRunInfo {
            version: "v0.1.0",
            url: "https://example.test/checksums.txt",
            policy: CorruptLedgerPolicy::Abort,
            targets: &targets,
        };

        let text = info.display_text();
        assert!(text.starts_with("Dry run"));
        assert!(text.contains("Corrupt ledger: abort"));
        assert!(text.contains("./sdks/python/src/test_server_sdk/install.py"));
        assert!(text.contains("./sdks/dotnet/tools/installer/Program.cs"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
