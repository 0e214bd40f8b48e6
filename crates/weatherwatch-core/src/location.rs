//! Location key normalization.
//!
//! Every component that turns a human-entered location name into a store
//! key goes through [`location_key`], so the scheduler and the query surface
//! always agree on what "moscow" means. The store itself never normalizes.

/// Canonical store key for a location display name: surrounding whitespace
/// trimmed, lowercased.
pub fn location_key(name: &str) -> String {
    name.trim().to_lowercase()
}
