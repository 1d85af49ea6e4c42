use std::sync::LazyLock;

use regex::Regex;

/// Letters, hyphens and apostrophes only. Examples: "Jane", "O'Brien", "Smith-Jones"
pub static PERSON_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\-']+$").unwrap());

/// Loose email shape: something, `@`, something, a dot, something. No whitespace.
pub static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
