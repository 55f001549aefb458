//! Package name normalization
//!
//! Python package names are case-insensitive and treat runs of `-`, `_` and `.`
//! as equivalent, so `Foo_Bar`, `foo.bar` and `foo--bar` all name the same
//! distribution. Every graph key and lookup goes through [`normalize_name`].

/// Normalize a package name (PEP 503).
///
/// Trims surrounding whitespace, lowercases, and collapses every run of
/// `-`, `_`, `.` into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
                in_separator = true;
            }
        } else {
            normalized.extend(c.to_lowercase());
            in_separator = false;
        }
    }

    normalized
}
