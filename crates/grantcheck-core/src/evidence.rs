//! Evidence linking for feedback lines.
//!
//! Every line a rule emits cites the answers it read, so a result can be
//! traced back to what the respondent entered.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerValue;
use crate::types::EvidenceSource;

/// An answer supporting a feedback line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// What this evidence shows (e.g., "employees = 10")
    pub claim: String,

    /// Where the evidence comes from
    pub source: EvidenceSource,

    /// Pointer to the answer (e.g., "answers.employees")
    pub pointer: String,
}

impl Evidence {
    /// Evidence taken directly from an answer.
    pub fn from_answer(field: &str, value: &AnswerValue) -> Self {
        Self {
            claim: format!("{} = {}", field, value),
            source: EvidenceSource::Answer,
            pointer: format!("answers.{}", field),
        }
    }

    /// Evidence from a value computed out of another answer, as of the
    /// evaluation date.
    pub fn from_derived(
        field: &str,
        value: &AnswerValue,
        source_field: &str,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            claim: format!("{} = {} (as of {})", field, value, as_of),
            source: EvidenceSource::Derived,
            pointer: format!("answers.{} <- answers.{}", field, source_field),
        }
    }
}
