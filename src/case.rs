//! Method-name to path-segment conversion.

/// Converts a camel-case identifier into a lowercase, underscore-separated
/// path segment.
///
/// An `_` goes between every ASCII lowercase letter or digit and a following
/// ASCII uppercase letter; then the whole string is lowercased. Runs of
/// capitals stay together, so `GetUserID2Name` becomes `get_user_id2_name`.
/// Identifiers that are already snake case come back unchanged.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = prev {
            if (p.is_ascii_lowercase() || p.is_ascii_digit()) && c.is_ascii_uppercase() {
                out.push('_');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out.to_lowercase()
}
