//! Post-call validation of backend output.
//!
//! Validation normalizes first and checks second: text is trimmed, and a
//! field that is empty after trimming counts as absent. A caller therefore
//! never sees whitespace-only or padded text.

use crate::debate::{DebateCandidate, DebateResponse};
use crate::error::{Error, Result};

/// Outcome of checking a candidate against its output contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    /// `Invalid` becomes a retryable `IncompleteOutput` error
    pub fn into_result(self, operation: &'static str) -> Result<T> {
        match self {
            Validation::Valid(value) => Ok(value),
            Validation::Invalid(reason) => Err(Error::incomplete_output(format!(
                "incomplete output from model: {}",
                reason
            ))
            .with_operation(operation)),
        }
    }
}

/// Trim a required text field; `Err` carries why it was rejected.
fn required_text(field: &str, value: Option<&str>) -> std::result::Result<String, String> {
    match value.map(str::trim) {
        None => Err(format!("{} is missing", field)),
        Some("") => Err(format!("{} is empty", field)),
        Some(text) => Ok(text.to_string()),
    }
}

pub fn validate_debate(candidate: &DebateCandidate) -> Validation<DebateResponse> {
    let advocate = required_text("advocateText", candidate.advocate_text.as_deref());
    let skeptic = required_text("skepticText", candidate.skeptic_text.as_deref());

    match (advocate, skeptic) {
        (Ok(advocate_text), Ok(skeptic_text)) => Validation::Valid(DebateResponse {
            advocate_text,
            skeptic_text,
        }),
        (advocate, skeptic) => {
            let reasons: Vec<String> = [advocate.err(), skeptic.err()].into_iter().flatten().collect();
            Validation::Invalid(reasons.join("; "))
        }
    }
}
