//! URL slug generation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Error, Result};

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new("[^a-z0-9]+").expect("slug pattern is valid"));

/// Lower-case `s` and collapse every run of characters outside `[a-z0-9]` into a single `-`,
/// trimming dashes from both ends.
///
/// Non-ASCII letters are treated as separators, so a string made only of them has no slug.
pub fn slugify(s: &str) -> Result<String> {
    if s.is_empty() {
        return Err(Error::BadRequest {
            message: "the string is empty".to_string(),
        });
    }

    let lowered = s.to_lowercase();
    let slug = NON_ALPHANUMERIC.replace_all(&lowered, "-").trim_matches('-').to_string();

    if slug.is_empty() {
        return Err(Error::BadRequest {
            message: "after slugifying the string, it is empty".to_string(),
        });
    }

    Ok(slug)
}
