//! Interfaces of the services that sit next to the generator.
//!
//! The generator never calls these. They exist so the surrounding
//! front-ends (document classification, a help chat) can be written
//! against a typed boundary.

use serde::{Deserialize, Serialize};

use crate::error::TaxFormError;

/// One candidate label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: String,
    pub confidence: f64,
}

/// A classifier's verdict on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub predicted_kind: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

impl Classification {
    /// Build a classification, rejecting confidences outside `[0, 1]`.
    pub fn new(predicted_kind: impl Into<String>, confidence: f64) -> Result<Self, TaxFormError> {
        check_confidence(confidence)?;
        Ok(Self {
            predicted_kind: predicted_kind.into(),
            confidence,
            candidates: Vec::new(),
        })
    }

    pub fn with_candidate(mut self, kind: impl Into<String>, confidence: f64) -> Result<Self, TaxFormError> {
        check_confidence(confidence)?;
        self.candidates.push(Candidate {
            kind: kind.into(),
            confidence,
        });
        Ok(self)
    }
}

fn check_confidence(confidence: f64) -> Result<(), TaxFormError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(TaxFormError::InvalidRequest(format!(
            "confidence {} is outside [0, 1]",
            confidence
        )))
    }
}

/// Classifies raw document bytes.
pub trait DocumentClassifier {
    fn classify(&self, document: &[u8]) -> Result<Classification, TaxFormError>;
}

/// Answers free-text questions with canned replies.
pub trait ChatResponder {
    fn respond(&self, message: &str) -> String;
}

/// First-match keyword responder for application questions.
#[derive(Debug, Clone, Default)]
pub struct KeywordResponder;

impl ChatResponder for KeywordResponder {
    fn respond(&self, message: &str) -> String {
        let message = message.to_lowercase();
        let reply = if message.contains("deadline") {
            "The application deadline for Fall 2025 is January 15."
        } else if message.contains("documents") {
            "You'll need transcripts, a personal statement, and recommendation letters."
        } else if message.contains("apply") {
            "To apply, visit our website, choose your program, and fill out the online application form."
        } else {
            "Sorry, I didn't understand. Could you rephrase your question?"
        };
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_branches() {
        let bot = KeywordResponder;
        assert!(bot.respond("When is the DEADLINE?").contains("January 15"));
        assert!(bot.respond("which documents do I need").contains("transcripts"));
        assert!(bot.respond("how do I apply").contains("online application"));
        assert!(bot.respond("hello").contains("rephrase"));
    }

    #[test]
    fn first_keyword_wins() {
        let bot = KeywordResponder;
        assert!(bot.respond("deadline to apply").contains("deadline"));
    }

    #[test]
    fn confidence_is_bounded() {
        assert!(Classification::new("1040", 0.93).is_ok());
        assert!(Classification::new("1040", 1.2).is_err());
        assert!(Classification::new("1040", 0.5)
            .unwrap()
            .with_candidate("schedule1", -0.1)
            .is_err());
    }

    struct FixedClassifier;

    impl DocumentClassifier for FixedClassifier {
        fn classify(&self, document: &[u8]) -> Result<Classification, TaxFormError> {
            let kind = if document.starts_with(b"%PDF") { "1040" } else { "unknown" };
            Classification::new(kind, 0.8)
        }
    }

    #[test]
    fn classifier_trait_is_object_safe() {
        let classifier: &dyn DocumentClassifier = &FixedClassifier;
        assert_eq!(classifier.classify(b"%PDF-1.7").unwrap().predicted_kind, "1040");
    }
}
