//! Value normalization for semantic tag fields
//!
//! Two independent rule engines live here: street names and postal codes.
//! Each exposes a validity predicate and a best-effort repair, and both report
//! their outcome as a [`Normalization`] so the caller decides whether a row is
//! emitted.

pub mod postcode;
pub mod street;

pub use postcode::{fix_postal_code, is_valid_postal_code, normalize_postal_code};
pub use street::{RulesError, StreetLedger, StreetRules};

/// Outcome of normalizing a single tag value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// The value was already valid and is emitted as-is
    Unchanged,
    /// The value was rewritten
    Repaired(String),
    /// The value could not be repaired; its row must not be emitted
    Dropped,
}

impl Normalization {
    /// Resolve against the original value, `None` when the row is dropped
    pub fn apply(self, original: String) -> Option<String> {
        match self {
            Normalization::Unchanged => Some(original),
            Normalization::Repaired(value) => Some(value),
            Normalization::Dropped => None,
        }
    }
}
