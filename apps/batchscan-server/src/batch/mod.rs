//! Batch number matching
//!
//! Scans OCR output for a batch number: a literal prefix followed by a fixed
//! number of ASCII alphanumeric characters (`medplus` + 12 by default).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use batchscan_server::batch::BatchPattern;
//!
//! let pattern = BatchPattern::default();
//! let found = pattern.find(Some("Lot: MEDPLUSabc123456789"));
//! assert_eq!(found.unwrap().value, "MEDPLUSabc123456789");
//! ```

use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Default batch number prefix
pub const DEFAULT_PREFIX: &str = "medplus";

/// Default number of alphanumeric characters after the prefix
pub const DEFAULT_SUFFIX_LENGTH: usize = 12;

/// Errors raised when building a pattern from configuration
#[derive(Debug, thiserror::Error)]
pub enum BatchPatternError {
    #[error("Batch prefix must not be empty")]
    EmptyPrefix,

    #[error("Batch suffix length must be greater than zero")]
    ZeroSuffixLength,

    #[error("Invalid batch pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// A matched batch number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMatch {
    /// Matched text, as it appears in the input
    pub value: String,
    /// Line number (1-indexed) the match was found on
    pub line: usize,
}

/// Compiled batch number pattern
#[derive(Debug, Clone)]
pub struct BatchPattern {
    prefix: String,
    suffix_len: usize,
    regex: Regex,
}

impl BatchPattern {
    /// Build a pattern for `<prefix><alnum>{suffix_len}`, case-insensitive
    pub fn new(prefix: &str, suffix_len: usize) -> Result<Self, BatchPatternError> {
        if prefix.is_empty() {
            return Err(BatchPatternError::EmptyPrefix);
        }
        if suffix_len == 0 {
            return Err(BatchPatternError::ZeroSuffixLength);
        }

        // Unicode case folding maps the Kelvin sign to 'k' and long s to 's'.
        // ASCII prefix characters and the suffix class fold within ASCII only.
        let source = format!(
            "{}(?-u:[A-Za-z0-9]){{{}}}",
            ascii_folding_literal(prefix),
            suffix_len
        );
        let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;

        Ok(Self {
            prefix: prefix.to_string(),
            suffix_len,
            regex,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }

    /// Total length of a batch number in characters
    pub fn match_len(&self) -> usize {
        self.prefix.chars().count() + self.suffix_len
    }

    /// Find the first batch number, scanning line by line
    ///
    /// Returns `None` for absent or empty text and when no line matches.
    pub fn find(&self, text: Option<&str>) -> Option<BatchMatch> {
        let text = text.filter(|t| !t.is_empty())?;

        text.lines().enumerate().find_map(|(idx, line)| {
            self.regex.find(line).map(|m| BatchMatch {
                value: m.as_str().to_string(),
                line: idx + 1,
            })
        })
    }

    /// Find every non-overlapping batch number, in line order
    pub fn find_all(&self, text: Option<&str>) -> Vec<BatchMatch> {
        let Some(text) = text else {
            return Vec::new();
        };

        text.lines()
            .enumerate()
            .flat_map(|(idx, line)| {
                self.regex.find_iter(line).map(move |m| BatchMatch {
                    value: m.as_str().to_string(),
                    line: idx + 1,
                })
            })
            .collect()
    }
}

/// Escape `literal`, wrapping each ASCII character in a non-Unicode group
///
/// Non-ASCII characters are not allowed inside `(?-u:..)`, so they keep the
/// regular Unicode case-insensitive matching.
fn ascii_folding_literal(literal: &str) -> String {
    let mut buf = [0u8; 4];
    literal
        .chars()
        .map(|c| {
            let escaped = regex::escape(c.encode_utf8(&mut buf));
            if c.is_ascii() {
                format!("(?-u:{})", escaped)
            } else {
                escaped
            }
        })
        .collect()
}

impl Default for BatchPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_SUFFIX_LENGTH).expect("valid default batch pattern")
    }
}
