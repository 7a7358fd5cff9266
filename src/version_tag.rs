//! Release tag newtype.
//!
//! Release tags carry a leading `v` (`v0.1.0`). The tag is copied verbatim
//! into ledgers and quoted source literals, so it must not contain
//! whitespace or quote characters. No semantic-version ordering is implied.

use std::fmt;
use std::str::FromStr;

/// Errors arising from an invalid release tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionTagError {
    /// The tag does not start with `v`.
    #[error("version tag \"{value}\" must start with 'v' (e.g. v0.1.0)")]
    MissingPrefix {
        /// The rejected tag.
        value: String,
    },

    /// The tag is just `v`.
    #[error("version tag must have a version after the 'v' prefix")]
    Empty,

    /// The tag contains a character that cannot appear in a quoted literal.
    #[error("version tag \"{value}\" contains invalid character {bad:?}")]
    InvalidCharacter {
        /// The rejected tag.
        value: String,
        /// The offending character.
        bad: char,
    },
}

/// A validated, `v`-prefixed release tag.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::version_tag::VersionTag;
///
/// let tag: VersionTag = "v0.1.0".parse().expect("valid tag");
/// assert_eq!(tag.as_str(), "v0.1.0");
/// assert_eq!(tag.without_prefix(), "0.1.0");
///
/// assert!("0.1.0".parse::<VersionTag>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    /// Return the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the tag without its leading `v`, as used in asset filenames.
    #[must_use]
    pub fn without_prefix(&self) -> &str {
        self.0.strip_prefix('v').unwrap_or(&self.0)
    }
}

impl TryFrom<&str> for VersionTag {
    type Error = VersionTagError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_tag(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for VersionTag {
    type Error = VersionTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_tag(&value)?;
        Ok(Self(value))
    }
}

impl FromStr for VersionTag {
    type Err = VersionTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_tag(value: &str) -> Result<(), VersionTagError> {
    let Some(rest) = value.strip_prefix('v') else {
        return Err(VersionTagError::MissingPrefix {
            value: value.to_owned(),
        });
    };
    if rest.is_empty() {
        return Err(VersionTagError::Empty);
    }
    if let Some(bad) = value
        .chars()
        .find(|&c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '/'))
    {
        return Err(VersionTagError::InvalidCharacter {
            value: value.to_owned(),
            bad,
        });
    }
    Ok(())
}
