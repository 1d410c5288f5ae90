//! Score marker extraction for presenting an analysis.
//!
//! The detection prompt asks the model to open its answer with
//! `<<SCORE:NN>>`. The resolver hands the text back untouched; display code
//! uses [`Verdict::parse`] to split the score from the prose.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `<<SCORE:NN>>` marker, digits only
    static ref SCORE_MARKER: Regex = Regex::new(r"<<SCORE:(\d+)>>").unwrap();
}

/// Score above which an analysis leans towards AI-generated.
pub const AI_LEANING_THRESHOLD: u8 = 50;

/// A parsed analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Probability of AI generation in percent, if the model complied
    pub score: Option<u8>,

    /// Analysis text with every score marker removed
    pub body: String,
}

impl Verdict {
    /// Parse a model answer.
    ///
    /// The first marker wins. Scores above 100 are treated as missing.
    pub fn parse(text: &str) -> Self {
        let score = SCORE_MARKER
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .filter(|score| *score <= 100);

        let body = SCORE_MARKER.replace_all(text, "").trim().to_string();

        Self { score, body }
    }

    /// Whether the score leans towards AI-generated.
    pub fn leans_ai(&self) -> bool {
        self.score.is_some_and(|s| s > AI_LEANING_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_marker() {
        let verdict = Verdict::parse("<<SCORE:12>> Human-written.");
        assert_eq!(verdict.score, Some(12));
        assert_eq!(verdict.body, "Human-written.");
        assert!(!verdict.leans_ai());
    }

    #[test]
    fn test_parse_without_marker() {
        let verdict = Verdict::parse("  No score here.  ");
        assert_eq!(verdict.score, None);
        assert_eq!(verdict.body, "No score here.");
        assert!(!verdict.leans_ai());
    }

    #[test]
    fn test_first_marker_wins_and_all_are_stripped() {
        let verdict = Verdict::parse("<<SCORE:87>> AI-generated. <<SCORE:3>>");
        assert_eq!(verdict.score, Some(87));
        assert_eq!(verdict.body, "AI-generated.");
        assert!(verdict.leans_ai());
    }

    #[test]
    fn test_out_of_range_score_ignored() {
        assert_eq!(Verdict::parse("<<SCORE:101>> x").score, None);
        assert_eq!(Verdict::parse("<<SCORE:999999>> x").score, None);
        assert_eq!(Verdict::parse("<<SCORE:100>> x").score, Some(100));
    }

    #[test]
    fn test_malformed_marker_left_in_body() {
        let verdict = Verdict::parse("<<SCORE:abc>> text");
        assert_eq!(verdict.score, None);
        assert_eq!(verdict.body, "<<SCORE:abc>> text");
    }

    proptest! {
        #[test]
        fn prop_any_valid_score_roundtrips(score in 0u8..=100, body in "[a-zA-Z .]{0,40}") {
            let verdict = Verdict::parse(&format!("<<SCORE:{}>>{}", score, body));
            prop_assert_eq!(verdict.score, Some(score));
            prop_assert_eq!(verdict.body, body.trim().to_string());
        }
    }
}
