//! Feature encoding for the regression network.
//!
//! A profile becomes `[one_hot(location) ++ normalized(xp)]`:
//!
//! - the one-hot block is sized to the vocabulary, with unknown locations
//!   mapped to the fallback entry at index 0
//! - experience is min/max normalised with the training range and clamped, so
//!   out-of-range values saturate instead of extrapolating

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CompensationRecord, FALLBACK_LOCATION};
use crate::math::MinMax;

/// Ordered, deduplicated set of known locations.
///
/// Index 0 is always the fallback entry. Order is discovery order in the
/// training population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LocationVocabulary {
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl LocationVocabulary {
    /// Vocabulary with nothing but the fallback entry.
    pub fn fallback_only() -> Self {
        Self::from(Vec::new())
    }

    /// Build from a population: fallback first, then every distinct non-empty
    /// location in the order it first appears.
    pub fn from_records(records: &[CompensationRecord]) -> Self {
        Self::from(records.iter().map(|r| r.location.clone()).collect::<Vec<_>>())
    }

    /// Vocabulary index of `location`, or the fallback index when unknown.
    pub fn index_of(&self, location: &str) -> usize {
        self.index.get(location).copied().unwrap_or(0)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.index.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true: the fallback entry always exists.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// One-hot vector for `location`.
    pub fn one_hot(&self, location: &str) -> Vec<f64> {
        let idx = self.index_of(location);
        (0..self.len()).map(|k| if k == idx { 1.0 } else { 0.0 }).collect()
    }
}

impl From<Vec<String>> for LocationVocabulary {
    fn from(locations: Vec<String>) -> Self {
        let mut entries = vec![FALLBACK_LOCATION.to_string()];
        let mut index = HashMap::from([(FALLBACK_LOCATION.to_string(), 0usize)]);
        for loc in locations {
            if loc.is_empty() || index.contains_key(&loc) {
                continue;
            }
            index.insert(loc.clone(), entries.len());
            entries.push(loc);
        }
        Self { entries, index }
    }
}

impl From<LocationVocabulary> for Vec<String> {
    fn from(vocab: LocationVocabulary) -> Self {
        vocab.entries
    }
}

/// Number of network inputs for a vocabulary: one-hot block plus experience.
pub fn input_dim(vocab: &LocationVocabulary) -> usize {
    vocab.len() + 1
}

/// Encode a raw `(location, xp)` pair.
pub fn encode_features(vocab: &LocationVocabulary, xp_range: &MinMax, location: &str, xp: f64) -> Vec<f64> {
    let mut out = vocab.one_hot(location);
    out.push(xp_range.normalize(xp));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(locs: &[&str]) -> Vec<CompensationRecord> {
        locs.iter()
            .map(|l| CompensationRecord::new(*l, Some(1.0), 1.0))
            .collect()
    }

    #[test]
    fn fallback_is_always_index_zero() {
        let v = LocationVocabulary::fallback_only();
        assert_eq!(v.entries(), ["other"]);
        assert_eq!(v.index_of("anything"), 0);

        let v = LocationVocabulary::from_records(&records(&["Paris", "other", "Lyon", "Paris", ""]));
        assert_eq!(v.entries(), ["other", "Paris", "Lyon"]);
        assert_eq!(v.index_of("Lyon"), 2);
        assert_eq!(v.index_of("Berlin"), 0);
        assert!(!v.contains(""));
    }

    #[test]
    fn encode_concatenates_one_hot_and_clamped_xp() {
        let v = LocationVocabulary::from_records(&records(&["Paris", "Lyon"]));
        let range = MinMax { min: 0.0, max: 20.0 };
        assert_eq!(encode_features(&v, &range, "Lyon", 10.0), vec![0.0, 0.0, 1.0, 0.5]);
        assert_eq!(encode_features(&v, &range, "Nowhere", 45.0), vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(encode_features(&v, &range, "Paris", -3.0)[3], 0.0);
        assert_eq!(input_dim(&v), 4);
    }

    #[test]
    fn vocabulary_round_trips_through_json_with_index() {
        let v = LocationVocabulary::from_records(&records(&["Paris", "Lyon"]));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"["other","Paris","Lyon"]"#);
        let back: LocationVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index_of("Lyon"), 2);
        assert_eq!(back, v);
    }
}
