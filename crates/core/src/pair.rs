use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairError {
    #[error("both values are required")]
    BlankValue,
}

/// The two values under review, kept as strings end-to-end so the user's
/// corrections pass through verbatim (no numeric re-formatting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPair {
    pub first: String,
    pub second: String,
}

impl NumberPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        NumberPair { first: first.into(), second: second.into() }
    }

    /// Takes the two leading tokens of an extraction result.
    /// `None` when fewer than two tokens were found.
    pub fn from_leading(tokens: &[String]) -> Option<Self> {
        match tokens {
            [first, second, ..] => Some(NumberPair::new(first, second)),
            _ => None,
        }
    }

    /// Builds a pair from user-edited drafts. Each draft is trimmed; a draft
    /// that is empty after trimming rejects the whole pair.
    pub fn from_drafts(first: &str, second: &str) -> Result<Self, PairError> {
        let first = first.trim();
        let second = second.trim();
        if first.is_empty() || second.is_empty() {
            return Err(PairError::BlankValue);
        }
        Ok(NumberPair::new(first, second))
    }
}

impl fmt::Display for NumberPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_leading_takes_first_two() {
        let tokens: Vec<String> =
            ["36.6", "101.2", "7"].iter().map(|s| s.to_string()).collect();
        let pair = NumberPair::from_leading(&tokens).unwrap();
        assert_eq!(pair, NumberPair::new("36.6", "101.2"));
    }

    #[test]
    fn from_leading_rejects_short_sequences() {
        assert!(NumberPair::from_leading(&[]).is_none());
        assert!(NumberPair::from_leading(&["42".to_string()]).is_none());
    }

    #[test]
    fn from_drafts_trims_whitespace() {
        let pair = NumberPair::from_drafts(" 10 ", "20\t").unwrap();
        assert_eq!(pair, NumberPair::new("10", "20"));
    }

    #[test]
    fn from_drafts_rejects_blank_values() {
        assert_eq!(NumberPair::from_drafts("", "100"), Err(PairError::BlankValue));
        assert_eq!(NumberPair::from_drafts("100", "   "), Err(PairError::BlankValue));
        assert_eq!(NumberPair::from_drafts(" ", ""), Err(PairError::BlankValue));
    }

    #[test]
    fn display_shows_both_values() {
        assert_eq!(NumberPair::new("36.6", "101.2").to_string(), "(36.6, 101.2)");
    }
}
