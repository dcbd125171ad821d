use std::collections::HashSet;

/// Splits a free-form interest list on commas and newlines.
///
/// Entries are trimmed, empties dropped, and duplicates removed case-insensitively
/// keeping the first spelling seen.
pub fn parse_interests(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(part.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// The retrieval query used for a listener's interests.
pub fn interests_query(interests: &[String]) -> String {
    interests.join(", ")
}
