//! Rule pattern parsing.
//!
//! Patterns arrive either as bare regex bodies (`crash(es)?`) or in
//! delimited form with trailing flags (`/crash(es)?/i`). Matching is always
//! case-insensitive; `m`, `s` and `x` flags are honoured, `g`, `u`, `y`
//! and `i` are accepted and ignored.

use crate::error::PatternError;
use regex::{Regex, RegexBuilder};

/// Upper bound on compiled program size for a single rule pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

const KNOWN_FLAGS: &str = "gimsuyx";

/// Regex body and flag letters split out of a raw pattern string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternParts<'a> {
    pub body: &'a str,
    pub flags: &'a str,
}

/// Strip `/…/flags` delimiters if present.
///
/// A string only counts as delimited when it starts with `/`, has a second
/// `/` later on, and everything after that last `/` is a known flag letter.
/// Anything else is returned unchanged as the body.
pub fn split_delimiters(raw: &str) -> PatternParts<'_> {
    if let Some(rest) = raw.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| KNOWN_FLAGS.contains(c)) {
                return PatternParts {
                    body: &rest[..end],
                    flags,
                };
            }
        }
    }
    PatternParts {
        body: raw,
        flags: "",
    }
}

/// Compile a rule pattern into a case-insensitive regex.
pub fn compile_pattern(raw: &str) -> Result<Regex, PatternError> {
    let parts = split_delimiters(raw.trim());
    if parts.body.is_empty() {
        return Err(PatternError::Empty {
            pattern: raw.to_string(),
        });
    }

    RegexBuilder::new(parts.body)
        .case_insensitive(true)
        .multi_line(parts.flags.contains('m'))
        .dot_matches_new_line(parts.flags.contains('s'))
        .ignore_whitespace(parts.flags.contains('x'))
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| PatternError::Invalid {
            pattern: raw.to_string(),
            message: e.to_string(),
        })
}
