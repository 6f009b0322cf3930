//! Core types shared by the evaluator, the synthesizer and callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::answers::AnswerRecord;
use crate::config::EvaluationConfig;
use crate::evidence::Evidence;
use crate::questionnaire::Questionnaire;

/// Where a piece of evidence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Entered by the respondent
    Answer,
    /// Computed from another answer (e.g., years since a start date)
    Derived,
}

/// Whether a fired rule counts for or against the applicant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Favorable,
    Unfavorable,
}

impl Outcome {
    pub fn symbol(self) -> &'static str {
        match self {
            Outcome::Favorable => "✅",
            Outcome::Unfavorable => "❌",
        }
    }
}

/// One line of results, produced by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackLine {
    /// The rule that produced this line
    pub rule_id: String,

    pub outcome: Outcome,

    /// Rendered message, without the outcome symbol
    pub text: String,

    /// Answers the rule read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

impl fmt::Display for FeedbackLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.outcome.symbol(), self.text)
    }
}

/// Everything one evaluation pass reads.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub questionnaire: &'a Questionnaire,
    pub answers: &'a AnswerRecord,
    pub config: &'a EvaluationConfig,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(
        questionnaire: &'a Questionnaire,
        answers: &'a AnswerRecord,
        config: &'a EvaluationConfig,
    ) -> Self {
        Self {
            questionnaire,
            answers,
            config,
        }
    }
}

/// The outcome of evaluating a questionnaire's rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Name of the questionnaire evaluated
    pub questionnaire: String,

    /// Date derived values and date bounds were computed against
    pub evaluation_date: NaiveDate,

    /// Lines in rule-catalog order
    pub lines: Vec<FeedbackLine>,

    /// Shown after the lines when at least one line fired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,

    /// Shown instead of lines when none fired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,

    /// One-sentence summary of the counts
    pub summary: String,

    pub evaluated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.lines.iter().filter(|l| l.outcome == outcome).count()
    }

    /// Display strings of the lines, in order.
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }

    /// True if some line was produced by `rule_id`.
    pub fn fired(&self, rule_id: &str) -> bool {
        self.lines.iter().any(|l| l.rule_id == rule_id)
    }
}
