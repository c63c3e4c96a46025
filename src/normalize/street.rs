//! Street name rules
//!
//! A street value is valid when its first space-delimited token is one of the
//! expected street-type words. Invalid values get their first token cleaned
//! up (periods removed, title-cased, abbreviations expanded); prefixes that
//! still don't match are tallied in a [`StreetLedger`].

use super::Normalization;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_EXPECTED: &[&str] = &[
    "Rua", "Avenida", "Praça", "Largo", "Ladeira", "Via", "Viaduto", "Travessa", "Parque",
    "Alameda", "Vila", "Rodovia", "Estrada",
];

const DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("Av", "Avenida"),
    ("Estr", "Estrada"),
    ("Pç", "Praça"),
    ("Al", "Alameda"),
    ("Alamedas", "Alameda"),
    ("Rue", "Rua"),
    ("Rúa", "Rua"),
    ("R", "Rua"),
];

/// Errors raised while loading street rules from disk
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read street rules from {path:?}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid street rules document")]
    Parse(#[from] serde_json::Error),
}

/// Locale-specific street vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetRules {
    /// Street-type words accepted as the first token
    pub expected: HashSet<String>,

    /// Title-cased abbreviation -> full street-type word
    #[serde(default)]
    pub abbreviations: HashMap<String, String>,
}

impl Default for StreetRules {
    fn default() -> Self {
        StreetRules {
            expected: DEFAULT_EXPECTED.iter().map(|s| s.to_string()).collect(),
            abbreviations: DEFAULT_ABBREVIATIONS
                .iter()
                .map(|(abbr, full)| (abbr.to_string(), full.to_string()))
                .collect(),
        }
    }
}

impl StreetRules {
    /// Parse rules from a JSON document
    ///
    /// ```rust
    /// use osm_melt::normalize::StreetRules;
    ///
    /// let rules = StreetRules::from_json_str(
    ///     r#"{"expected": ["Street"], "abbreviations": {"St": "Street"}}"#,
    /// ).unwrap();
    /// assert!(rules.is_valid_street_prefix("Street of Dreams"));
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load rules from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        Self::from_json_str(&json)
    }

    /// True iff the first space-delimited token is an expected street type
    pub fn is_valid_street_prefix(&self, value: &str) -> bool {
        let prefix = value.split(' ').next().unwrap_or_default();
        self.expected.contains(prefix)
    }

    /// Best-effort rewrite of the street-type token
    ///
    /// Always returns a value. Prefixes that remain unexpected after cleanup
    /// are counted in `ledger`.
    pub fn normalize_street(&self, value: &str, ledger: &mut StreetLedger) -> String {
        let (first, rest) = match value.split_once(' ') {
            Some((first, rest)) => (first, Some(rest)),
            None => (value, None),
        };

        let cleaned = title_case(&first.replace('.', ""));
        let prefix = match self.abbreviations.get(&cleaned) {
            Some(full) => full.clone(),
            None => cleaned,
        };

        if !self.expected.contains(&prefix) {
            ledger.record(&prefix);
        }

        match rest {
            Some(rest) => format!("{} {}", prefix, rest),
            None => prefix,
        }
    }

    /// Validate, then rewrite if needed
    pub fn normalize(&self, value: &str, ledger: &mut StreetLedger) -> Normalization {
        if self.is_valid_street_prefix(value) {
            Normalization::Unchanged
        } else {
            Normalization::Repaired(self.normalize_street(value, ledger))
        }
    }
}

/// Upper-case the first letter of every run of cased letters, lower-case the rest
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut in_word = false;
    for c in word.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased && in_word {
            out.extend(c.to_lowercase());
        } else if cased {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = cased;
    }
    out
}

/// Tally of street prefixes that could not be mapped to an expected form
///
/// Owned by a single pipeline run and read once the document is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreetLedger {
    counts: BTreeMap<String, u64>,
}

impl StreetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `prefix`
    pub fn record(&mut self, prefix: &str) {
        *self.counts.entry(prefix.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, prefix: &str) -> u64 {
        self.counts.get(prefix).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries in prefix order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(prefix, count)| (prefix.as_str(), *count))
    }
}
