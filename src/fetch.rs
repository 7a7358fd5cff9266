//! Checksum manifest retrieval.
//!
//! Provides a trait-based abstraction for downloading a release's
//! `checksums.txt` from GitHub, so the synchroniser can be driven by a mock
//! in tests.

use crate::config::Project;
use crate::version_tag::VersionTag;
use std::time::Duration;

/// Trait for fetching the checksum manifest of a release.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::fetch::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(None);
/// // Use fetcher.fetch_manifest(&project, &tag) in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ManifestFetcher {
    /// Fetch the raw `checksums.txt` content for `tag` of `project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server does not answer
    /// with `200 OK`.
    fn fetch_manifest(&self, project: &Project, tag: &VersionTag) -> Result<String, FetchError>;
}

/// Errors arising from manifest retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be completed.
    #[error("failed to download checksums file from {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered with a status other than `200 OK`.
    #[error("failed to download checksums file from {url}: status {status}, body: {body}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The response body could not be read as text.
    #[error("failed to read response body from {url}: {reason}")]
    Body {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// Name of the checksum asset published with `tag`.
///
/// Asset names use the bare version; the download path keeps the tag.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::fetch::checksums_filename;
/// use sdk_checksum_sync::version_tag::VersionTag;
///
/// let tag = VersionTag::try_from("v0.2.8").expect("valid tag");
/// assert_eq!(checksums_filename("test-server", &tag), "test-server_0.2.8_checksums.txt");
/// ```
#[must_use]
pub fn checksums_filename(project_name: &str, tag: &VersionTag) -> String {
    format!("{project_name}_{}_checksums.txt", tag.without_prefix())
}

/// GitHub release download URL of the checksum asset for `tag`.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::config::Project;
/// use sdk_checksum_sync::fetch::manifest_url;
/// use sdk_checksum_sync::version_tag::VersionTag;
///
/// let tag = VersionTag::try_from("v0.2.8").expect("valid tag");
/// let url = manifest_url(&Project::default(), &tag);
/// assert_eq!(
///     url,
///     "https://github.com/google/test-server/releases/download/v0.2.8/test-server_0.2.8_checksums.txt"
/// );
/// ```
#[must_use]
pub fn manifest_url(project: &Project, tag: &VersionTag) -> String {
    format!(
        "https://github.com/{}/{}/releases/download/{tag}/{}",
        project.owner,
        project.repo,
        checksums_filename(&project.name, tag)
    )
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Build a fetcher with an optional overall request timeout.
    ///
    /// Without a timeout a stalled connection blocks until the transport
    /// gives up.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ManifestFetcher for HttpFetcher {
    fn fetch_manifest(&self, project: &Project, tag: &VersionTag) -> Result<String, FetchError> {
        let url = manifest_url(project, tag);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Body {
                url: url.clone(),
                reason: e.to_string(),
            });

        if status != 200 {
            return Err(FetchError::Status {
                url,
                status,
                body: body.unwrap_or_default(),
            });
        }
        body
    }
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(status) => FetchError::Status {
            url: url.to_owned(),
            status: *status,
            body: String::new(),
        },
        other => FetchError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
