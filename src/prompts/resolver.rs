//! Turn raw user input into the canonical prompt sent to the service.

use super::catalog::PromptCatalog;

/// Parse `input` as a 1-based catalog position.
///
/// Returns `None` for anything that is not an integer in `1..=len`.
pub fn selection_index(input: &str, len: usize) -> Option<usize> {
    input
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
}

/// Resolve user input against the catalog.
///
/// 1. An integer in `1..=catalog.len()` selects that entry (display order).
/// 2. Otherwise an exact key match selects that entry.
/// 3. Otherwise the input is returned unchanged as a free-form prompt.
///
/// Out-of-range numbers such as `"0"` or `"99"` fall through to rule 3 and
/// are sent literally.
pub fn resolve(input: &str, catalog: &PromptCatalog) -> String {
    if let Some(entry) = selection_index(input, catalog.len()).and_then(|n| catalog.entry_at(n)) {
        return entry.text.clone();
    }
    catalog
        .get(input)
        .map_or_else(|| input.to_string(), str::to_string)
}
