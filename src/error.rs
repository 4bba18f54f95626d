//! Structured error types for form generation.
//!
//! Every failure in the core is local and synchronous. Nothing here is
//! retried: a missing capability or an invalid record will not fix itself
//! on a second attempt.

use std::io;

use thiserror::Error;

use crate::model::FormKind;

/// The unified error type returned by all public API functions.
#[derive(Debug, Error)]
pub enum TaxFormError {
    /// The drawing backend is not compiled in or was disabled in config.
    #[error("rendering unavailable: the PDF drawing capability is not present")]
    MissingCapability,

    /// A record violates a field invariant.
    #[error("invalid {kind} record: field '{field}' {reason}")]
    InvalidRecord {
        kind: FormKind,
        field: String,
        reason: String,
    },

    /// A batch request is malformed (zero count, duplicate years, ...).
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),

    /// Two manifest entries resolved to the same archive name.
    #[error("archive name collision: '{0}' is produced by more than one entry")]
    NamingCollision(String),

    /// A document handed to the packager has no bytes.
    #[error("document '{0}' is empty")]
    EmptyDocument(String),

    /// One iteration failed and the whole batch was discarded.
    #[error("batch aborted at iteration {position}: {source}")]
    BatchAborted {
        position: usize,
        #[source]
        source: Box<TaxFormError>,
    },

    /// The caller cancelled the batch between two iterations.
    #[error("batch cancelled after {completed} documents")]
    Cancelled { completed: usize },

    /// JSON input failed to parse.
    #[error("failed to parse input: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// Bytes handed to the inspector aren't a PDF this crate can read.
    #[error("cannot inspect document: {0}")]
    Inspect(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for TaxFormError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        TaxFormError::Parse { source: e, hint }
    }
}

impl TaxFormError {
    pub(crate) fn invalid_record(
        kind: FormKind,
        field: &str,
        reason: impl Into<String>,
    ) -> Self {
        TaxFormError::InvalidRecord {
            kind,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// The innermost cause, looking through batch aborts.
    pub fn root_cause(&self) -> &TaxFormError {
        match self {
            TaxFormError::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: TaxFormError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint:"), "{}", msg);
        assert!(msg.contains("trailing commas"));
    }

    #[test]
    fn root_cause_unwraps_batch_abort() {
        let err = TaxFormError::BatchAborted {
            position: 3,
            source: Box::new(TaxFormError::MissingCapability),
        };
        assert!(matches!(err.root_cause(), TaxFormError::MissingCapability));
        assert!(err.to_string().contains("iteration 3"));
    }
}
