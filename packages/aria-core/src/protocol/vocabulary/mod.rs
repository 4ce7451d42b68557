//! Command vocabulary: request patterns and response formatters for every
//! operation the device understands.
//!
//! Each pattern couples an anchored regular expression with its expected
//! match count (total groups including the whole match). The count doubles
//! as a structural assertion: a handler that receives the wrong number of
//! groups fails the request with *bad-command* rather than misparse it.
//!
//! Patterns are process-wide immutable statics, compiled lazily on first use.

pub mod configuration;
pub mod equalizer_presets;
pub mod favorites;
pub mod front_panel;
pub mod groups;
pub mod infrared;
pub mod network;
pub mod sources;
pub mod zones;

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{ProxyError, ProxyResult};

/// The uniform error response frame body.
pub const ERROR_BODY: &str = "ERROR";

/// Pattern matching the device's error response frame.
pub static ERROR_RESPONSE: Pattern = Pattern::new("error response", r"^ERROR$", 1);

/// An anchored wire pattern with its expected match count.
pub struct Pattern {
    name: &'static str,
    expression: &'static str,
    expected_matches: usize,
    cell: OnceLock<Regex>,
}

impl Pattern {
    /// Declares a pattern. `expected_matches` counts the whole match plus
    /// every capturing group.
    pub const fn new(name: &'static str, expression: &'static str, expected_matches: usize) -> Self {
        Self {
            name,
            expression,
            expected_matches,
            cell: OnceLock::new(),
        }
    }

    /// Human-readable operation name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The compiled expression. Expressions are static and covered by tests,
    /// so compilation cannot fail at runtime.
    pub fn regex(&self) -> &Regex {
        self.cell
            .get_or_init(|| Regex::new(self.expression).expect("static pattern compiles"))
    }

    /// Matches `body` against the pattern, enforcing the expected match
    /// count. A count mismatch is a vocabulary bug, logged and treated as a
    /// non-match so the request fails with *bad-command*.
    pub fn matches<'a>(&self, body: &'a str) -> Option<Captures<'a>> {
        let captures = self.regex().captures(body)?;
        if captures.len() != self.expected_matches {
            log::error!(
                "[Vocabulary] Pattern `{}` produced {} group(s), expected {}",
                self.name,
                captures.len(),
                self.expected_matches
            );
            return None;
        }
        Some(captures)
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("expected_matches", &self.expected_matches)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capture extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts a capture group as text.
pub fn capture_str<'a>(captures: &Captures<'a>, index: usize) -> ProxyResult<&'a str> {
    captures
        .get(index)
        .map(|group| group.as_str())
        .ok_or_else(|| ProxyError::BadCommand(format!("missing capture group {index}")))
}

/// Extracts a capture group as an unsigned integer.
pub fn capture_u32(captures: &Captures<'_>, index: usize) -> ProxyResult<u32> {
    let text = capture_str(captures, index)?;
    text.parse()
        .map_err(|_| ProxyError::BadCommand(format!("unparsable integer `{text}`")))
}

/// Extracts a capture group as a signed integer.
pub fn capture_i16(captures: &Captures<'_>, index: usize) -> ProxyResult<i16> {
    let text = capture_str(captures, index)?;
    text.parse()
        .map_err(|_| ProxyError::BadCommand(format!("unparsable integer `{text}`")))
}

/// Extracts a `0`/`1` capture group as a flag.
pub fn capture_flag(captures: &Captures<'_>, index: usize) -> ProxyResult<bool> {
    match capture_str(captures, index)? {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(ProxyError::BadCommand(format!("unparsable flag `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every pattern in the vocabulary, for structural assertions.
    fn all_patterns() -> Vec<&'static Pattern> {
        let mut patterns = vec![&ERROR_RESPONSE];
        patterns.extend(zones::all_patterns());
        patterns.extend(groups::all_patterns());
        patterns.extend(sources::all_patterns());
        patterns.extend(favorites::all_patterns());
        patterns.extend(equalizer_presets::all_patterns());
        patterns.extend(front_panel::all_patterns());
        patterns.extend(infrared::all_patterns());
        patterns.extend(network::all_patterns());
        patterns.extend(configuration::all_patterns());
        patterns
    }

    #[test]
    fn every_pattern_compiles_with_its_declared_match_count() {
        for pattern in all_patterns() {
            let regex = pattern.regex();
            assert_eq!(
                regex.captures_len(),
                pattern.expected_matches,
                "pattern `{}` declares the wrong match count",
                pattern.name()
            );
            assert!(
                pattern.expression.starts_with('^') && pattern.expression.ends_with('$'),
                "pattern `{}` must be anchored",
                pattern.name()
            );
        }
    }

    #[test]
    fn capture_helpers_reject_garbage() {
        let captures = zones::SET_VOLUME_REQUEST.matches("VZ3,-20").unwrap();
        assert_eq!(capture_u32(&captures, 1).unwrap(), 3);
        assert_eq!(capture_i16(&captures, 2).unwrap(), -20);
        assert!(capture_str(&captures, 9).is_err());
    }

    #[test]
    fn error_response_matches_only_the_error_frame() {
        assert!(ERROR_RESPONSE.matches("ERROR").is_some());
        assert!(ERROR_RESPONSE.matches("ERROR1").is_none());
    }
}
