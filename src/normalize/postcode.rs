//! Postal code rules (`NNNNN-NNN`)

use super::Normalization;
use once_cell::sync::Lazy;
use regex::Regex;

// Exactly one separator, five characters before it and three after.
static POSTAL_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^-]{5}-[^-]{3}$").unwrap()
});

/// Suffix appended to five-character codes that lack the district part
const MISSING_SUFFIX: &str = "-000";

/// Check whether a postal code follows the `5-3` layout
pub fn is_valid_postal_code(value: &str) -> bool {
    POSTAL_CODE_REGEX.is_match(value)
}

/// Repair a postal code written without its separator
///
/// Eight-character values get a `-` after the fifth character and
/// five-character values get `-000` appended. Anything else, or a repair that
/// still fails validation, yields `None`.
pub fn fix_postal_code(value: &str) -> Option<String> {
    let fixed = match value.chars().count() {
        8 => {
            let split = value.char_indices().nth(5).map(|(idx, _)| idx)?;
            format!("{}-{}", &value[..split], &value[split..])
        }
        5 => format!("{}{}", value, MISSING_SUFFIX),
        _ => return None,
    };

    if is_valid_postal_code(&fixed) {
        Some(fixed)
    } else {
        None
    }
}

/// Validate, then repair if needed
pub fn normalize_postal_code(value: &str) -> Normalization {
    if is_valid_postal_code(value) {
        return Normalization::Unchanged;
    }
    match fix_postal_code(value) {
        Some(fixed) => Normalization::Repaired(fixed),
        None => Normalization::Dropped,
    }
}
