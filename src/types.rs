use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NCBI taxonomy identifier, digits only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxId(String);

impl TaxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entrez query term restricting a search to this organism
    pub fn search_term(&self) -> String {
        format!("txid{}[Organism]", self.0)
    }
}

impl FromStr for TaxId {
    type Err = RetrieverError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RetrieverError::InvalidInput(format!(
                "taxonomic id must be a non-empty string of digits, got '{s}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive bounds on sequence length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    min: usize,
    max: usize,
}

impl LengthRange {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(RetrieverError::InvalidInput(format!(
                "minimum length {min} exceeds maximum length {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min <= len && len <= self.max
    }
}

/// History-server handle returned by ESearch with `usehistory=y`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHandle {
    pub count: usize,
    pub web_env: String,
    pub query_key: String,
}

/// One record that passed the length filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub accession: String,
    pub length: usize,
    pub description: String,
}

/// Counters collected over a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub total_found: usize,
    pub requested: usize,
    pub parsed: usize,
    pub kept: usize,
    pub batches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxid_accepts_digits_and_trims() {
        let id: TaxId = " 2697049\n".parse().unwrap();
        assert_eq!(id.as_str(), "2697049");
        assert_eq!(id.search_term(), "txid2697049[Organism]");
        assert_eq!(id.to_string(), "2697049");
    }

    #[test]
    fn taxid_rejects_non_digits() {
        assert!("".parse::<TaxId>().is_err());
        assert!("txid9606".parse::<TaxId>().is_err());
        assert!("96 06".parse::<TaxId>().is_err());
        assert!("-1".parse::<TaxId>().is_err());
    }

    #[test]
    fn length_range_is_inclusive() {
        let range = LengthRange::new(100, 200).unwrap();
        assert!(!range.contains(99));
        assert!(range.contains(100));
        assert!(range.contains(150));
        assert!(range.contains(200));
        assert!(!range.contains(201));
    }

    #[test]
    fn length_range_allows_single_value() {
        let range = LengthRange::new(42, 42).unwrap();
        assert!(range.contains(42));
        assert!(!range.contains(41));
    }

    #[test]
    fn length_range_rejects_inverted_bounds() {
        let err = LengthRange::new(500, 10).unwrap_err();
        assert!(matches!(err, RetrieverError::InvalidInput(_)));
    }
}
