//! Pattern checks shared by metadata validation and value parsing.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

/// Identifier shape accepted for object, table, field and enum names.
pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Canonical date-time text.
pub const DATETIME_PATTERN: &str = r"^(\d{4})-(\d{2})-(\d{2}) (\d{2}):(\d{2}):(\d{2})$";

/// Compiled patterns, built lazily and kept for the process lifetime.
struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern.
///
/// Invalid patterns are logged and treated as a non-match.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern, treating as non-match"
            );
            false
        }
    }
}

pub fn is_identifier(name: &str) -> bool {
    matches_pattern(name, IDENTIFIER_PATTERN)
}

/// Split canonical date-time text into year, month, day, hour, minute and
/// second. The month is returned as written (one-based).
pub fn datetime_parts(text: &str) -> Option<[u32; 6]> {
    let regex = regex_cache().get_or_compile(DATETIME_PATTERN).ok()?;
    let captures = regex.captures(text)?;
    let mut parts = [0u32; 6];
    for (slot, index) in parts.iter_mut().zip(1..=6) {
        *slot = captures.get(index)?.as_str().parse().ok()?;
    }
    Some(parts)
}
