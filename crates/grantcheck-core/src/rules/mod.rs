//! The rule catalog.
//!
//! Each rule pairs a [`Condition`] with a message template. Rules are
//! independent: every rule in a catalog is evaluated, top to bottom, and
//! none of them reads another rule's result. A rule whose condition does
//! not definitely hold contributes nothing.

mod condition;
pub mod template;

pub use condition::{CompareOp, Condition};

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;
use crate::types::{EvaluationRequest, FeedbackLine, Outcome};

/// A single eligibility rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier (e.g., "SIZE1")
    pub id: String,

    /// Whether a firing rule counts for or against the applicant
    #[serde(default)]
    pub outcome: Outcome,

    /// When the rule fires
    pub when: Condition,

    /// Message template, see [`template`]
    pub message: String,
}

impl Rule {
    /// Evaluate this rule. Returns a feedback line only when it fires.
    pub fn evaluate(&self, request: &EvaluationRequest) -> Option<FeedbackLine> {
        if !self.when.holds(request.answers) {
            return None;
        }

        let text = template::render(&self.message, request.answers);
        tracing::debug!(rule = %self.id, "Rule fired");

        Some(FeedbackLine {
            rule_id: self.id.clone(),
            outcome: self.outcome,
            text,
            evidence: self.collect_evidence(request),
        })
    }

    /// Every field this rule reads, from its condition and its message.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = self.when.fields();
        for name in template::placeholders(&self.message) {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    fn collect_evidence(&self, request: &EvaluationRequest) -> Vec<Evidence> {
        self.fields()
            .into_iter()
            .filter_map(|field| {
                let value = request.answers.value(field)?;
                let evidence = match request.questionnaire.derived_from(field) {
                    Some(source) => Evidence::from_derived(
                        field,
                        value,
                        source,
                        request.config.evaluation_date,
                    ),
                    None => Evidence::from_answer(field, value),
                };
                Some(evidence)
            })
            .collect()
    }
}
