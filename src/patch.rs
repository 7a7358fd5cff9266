//! In-place rewriting of pinned version strings.
//!
//! Every SDK installer pins the release it downloads with a declaration such
//! as:
//!
//! ```text
//! TEST_SERVER_VERSION = "v0.2.8"
//! const TEST_SERVER_VERSION = 'v0.2.8';
//! private const string TEST_SERVER_VERSION = "v0.2.8"; // bumped by CI
//! ```
//!
//! A line is treated as a declaration when it matches
//! `prefix identifier ws [':' ws type ws] '=' ws quote literal quote suffix`,
//! where the identifier is a whole word, `type` is a dotted name such as
//! `string` or `System.String`, and the `=` is a plain assignment rather than
//! part of `==` or `=>`. Lines that only use the identifier, as a call
//! argument or on the right of an assignment, never match. Only the literal
//! between the quotes is replaced.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Location of the quoted literal in a declaration line.
///
/// Offsets are byte positions within the line that was matched, excluding
/// the quote characters themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    start: usize,
    end: usize,
    quote: char,
}

impl Declaration {
    /// The quote character delimiting the literal.
    #[must_use]
    pub fn quote(&self) -> char {
        self.quote
    }

    /// Returns the literal's current contents within `line`.
    #[must_use]
    pub fn literal<'a>(&self, line: &'a str) -> &'a str {
        line.get(self.start..self.end).unwrap_or_default()
    }

    /// Returns `line` with the literal replaced by `value`.
    fn splice(&self, line: &str, value: &str) -> String {
        let (head, rest) = line.split_at(self.start);
        let (_, tail) = rest.split_at(self.end - self.start);
        let mut spliced = String::with_capacity(head.len() + value.len() + tail.len());
        spliced.push_str(head);
        spliced.push_str(value);
        spliced.push_str(tail);
        spliced
    }
}

/// Find the version declaration for `identifier` in a single line.
///
/// Returns `None` when the identifier does not appear as a whole word, or
/// when no occurrence is followed by an assignment of a quoted literal.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::patch::find_declaration;
///
/// let line = r#"    TEST_SERVER_VERSION = "v0.0.9"  # pinned"#;
/// let declaration = find_declaration(line, "TEST_SERVER_VERSION").expect("declaration");
/// assert_eq!(declaration.literal(line), "v0.0.9");
///
/// assert!(find_declaration(r#"MAX_VERSION = "3""#, "VERSION").is_none());
/// ```
#[must_use]
pub fn find_declaration(line: &str, identifier: &str) -> Option<Declaration> {
    if identifier.is_empty() {
        return None;
    }

    line.match_indices(identifier)
        .filter(|(start, _)| is_whole_word(line, *start, identifier.len()))
        .find_map(|(start, _)| match_assignment(line, start + identifier.len()))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_whole_word(line: &str, start: usize, len: usize) -> bool {
    let before = line.get(..start).and_then(|head| head.chars().next_back());
    let after = line.get(start + len..).and_then(|tail| tail.chars().next());
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Match `ws [':' ws type ws] '=' ws quote literal quote` starting at
/// `offset`.
fn match_assignment(line: &str, offset: usize) -> Option<Declaration> {
    let rest = skip_type_annotation(line.get(offset..)?.trim_start())?;
    let after_operator = rest.strip_prefix('=')?;
    if after_operator.starts_with(['=', '>']) {
        return None;
    }

    let value = after_operator.trim_start();
    let quote = value.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let body = value.strip_prefix(quote)?;
    let close = body.find(quote)?;

    let start = line.len() - body.len();
    Some(Declaration {
        start,
        end: start + close,
        quote,
    })
}

/// Skip an optional `: Type` annotation and the whitespace after it.
///
/// Returns `None` when a `:` is not followed by a type name.
fn skip_type_annotation(rest: &str) -> Option<&str> {
    let Some(annotated) = rest.strip_prefix(':') else {
        return Some(rest);
    };
    let type_name = annotated.trim_start();
    let type_len = type_name
        .find(|c: char| !(is_word_char(c) || c == '.'))
        .unwrap_or(type_name.len());
    if type_len == 0 {
        return None;
    }
    type_name.get(type_len..).map(str::trim_start)
}

/// Text produced by [`patch_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedContent {
    /// The rewritten text.
    pub text: String,
    /// Number of declaration lines rewritten.
    pub replacements: usize,
}

/// Rewrite every declaration of `identifier` in `content` to `new_version`.
///
/// Lines without a declaration, and everything around the literal on lines
/// with one, are copied unchanged, including `\r\n` line endings.
///
/// # Examples
///
/// ```
/// use sdk_checksum_sync::patch::patch_content;
///
/// let source = "const TEST_SERVER_VERSION = 'v0.0.9'; // pinned\n";
/// let patched = patch_content(source, "TEST_SERVER_VERSION", "v0.1.0");
/// assert_eq!(patched.text, "const TEST_SERVER_VERSION = 'v0.1.0'; // pinned\n");
/// assert_eq!(patched.replacements, 1);
/// ```
#[must_use]
pub fn patch_content(content: &str, identifier: &str, new_version: &str) -> PatchedContent {
    let mut text = String::with_capacity(content.len());
    let mut replacements = 0;

    for line in content.split_inclusive('\n') {
        let content_len = line.trim_end_matches(['\n', '\r']).len();
        let (body, ending) = line.split_at(content_len);

        match find_declaration(body, identifier) {
            Some(declaration) => {
                debug!(
                    "rewriting {identifier} from {} to {new_version}",
                    declaration.literal(body)
                );
                text.push_str(&declaration.splice(body, new_version));
                replacements += 1;
            }
            None => text.push_str(body),
        }
        text.push_str(ending);
    }

    PatchedContent { text, replacements }
}

/// Result of patching one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one declaration was rewritten and the file was saved.
    Patched {
        /// Number of declaration lines rewritten.
        replacements: usize,
    },
    /// The file declares no such identifier; it was left untouched.
    SkippedIdentifierNotFound,
}

/// Errors arising while patching a file.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The file could not be read as UTF-8 text.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The rewritten content could not be saved.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Set the version declared by `identifier` in the file at `path`.
///
/// The file is rewritten in place so its permissions are kept, and a
/// read-only file fails rather than being replaced.
///
/// # Errors
///
/// Returns [`PatchError`] when the file cannot be read or written. A file
/// without the identifier is not an error; it yields
/// [`PatchOutcome::SkippedIdentifierNotFound`].
pub fn patch_version(
    path: &Utf8Path,
    new_version: &str,
    identifier: &str,
) -> Result<PatchOutcome, PatchError> {
    let content = fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_owned(),
        source,
    })?;

    let patched = patch_content(&content, identifier, new_version);
    if patched.replacements == 0 {
        debug!("{identifier} not declared in {path}");
        return Ok(PatchOutcome::SkippedIdentifierNotFound);
    }

    fs::write(path, patched.text).map_err(|source| PatchError::Write {
        path: path.to_owned(),
        source,
    })?;

    Ok(PatchOutcome::Patched {
        replacements: patched.replacements,
    })
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod tests;
