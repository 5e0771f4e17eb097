//! Transient duration extraction from natural-language circuit descriptions.
//!
//! The extractor is a best-effort pattern match: it looks for phrases such as
//! "run transient analysis for 6 ms" and normalizes the duration into a
//! compact LTspice token (`6ms`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ordered duration phrases. Earlier entries take precedence over later ones,
/// regardless of where in the text they appear.
pub const DURATION_PHRASES: &[&str] = &["run transient analysis for", "run for", "over", "for"];

static DURATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DURATION_PHRASES
        .iter()
        .map(|phrase| {
            let lead = phrase.replace(' ', r"\s+");
            Regex::new(&format!(
                r"(?i)\b{lead}\s*([0-9]+(?:\.[0-9]+)?)\s*(ms|s)\b"
            ))
            .expect("static duration pattern")
        })
        .collect()
});

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)(ms|s)$").expect("static token pattern"));

/// A normalized transient stop time such as `6ms` or `0.01s`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurationToken(String);

/// Returned when a string cannot be read as a duration token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration token '{0}': expected <number><ms|s>, e.g. 6ms or 0.01s")]
pub struct InvalidDurationToken(pub String);

impl DurationToken {
    /// Parse a token, tolerating whitespace between number and unit and any
    /// unit casing (`"6 MS"` becomes `6ms`).
    pub fn parse(raw: &str) -> Result<Self, InvalidDurationToken> {
        let compact = normalize_token(raw);
        if TOKEN_PATTERN.is_match(&compact) {
            Ok(Self(compact))
        } else {
            Err(InvalidDurationToken(raw.to_string()))
        }
    }

    fn from_parts(value: &str, unit: &str) -> Self {
        Self(format!("{}{}", value, unit.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `.tran` directive this token requires, e.g. `.tran 6ms`.
    pub fn directive(&self) -> String {
        format!(".tran {}", self.0)
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DurationToken {
    type Err = InvalidDurationToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DurationToken {
    type Error = InvalidDurationToken;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DurationToken> for String {
    fn from(token: DurationToken) -> Self {
        token.0
    }
}

/// Remove all whitespace and lowercase. Used both for tokens and for the
/// remainder of `.tran` lines so that `6 ms` and `6ms` compare equal.
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Scan free-form text for a transient duration phrase.
///
/// Patterns are tried in [`DURATION_PHRASES`] order; within a pattern the
/// leftmost match wins. Returns `None` when nothing matches, which callers
/// treat as "no required duration".
pub fn extract_duration(spec_text: &str) -> Option<DurationToken> {
    DURATION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(spec_text)
            .map(|caps| DurationToken::from_parts(&caps[1], &caps[2]))
    })
}
