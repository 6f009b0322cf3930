//! Synthesizer: Assembles fired rule lines into an assessment.
//!
//! The synthesizer applies fixed presentation rules:
//! 1. Lines keep rule-catalog order; nothing is merged, ranked or dropped
//! 2. If at least one line fired, the questionnaire's next steps follow
//! 3. If no line fired, the incomplete notice is shown instead
//!
//! Eligibility itself is never decided here.

use chrono::Utc;

use crate::config::EvaluationConfig;
use crate::questionnaire::Questionnaire;
use crate::types::{Assessment, FeedbackLine, Outcome};

/// The Synthesizer turns feedback lines into an [`Assessment`].
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Synthesize feedback lines into an assessment.
    ///
    /// # Arguments
    ///
    /// * `lines` - Lines from every rule that fired, in catalog order
    /// * `questionnaire` - The questionnaire (for the fixed results text)
    /// * `config` - The evaluation settings
    pub fn synthesize(
        &self,
        lines: Vec<FeedbackLine>,
        questionnaire: &Questionnaire,
        config: &EvaluationConfig,
    ) -> Assessment {
        let summary = self.build_summary(&lines, questionnaire.rules.len());

        let (next_steps, notice) = if lines.is_empty() {
            (None, Some(questionnaire.results.incomplete_notice.clone()))
        } else if config.include_next_steps {
            (questionnaire.results.next_steps.clone(), None)
        } else {
            (None, None)
        };

        Assessment {
            questionnaire: questionnaire.name.clone(),
            evaluation_date: config.evaluation_date,
            lines,
            next_steps,
            notice,
            summary,
            evaluated_at: Utc::now(),
        }
    }

    /// Build a one-sentence count of what fired.
    fn build_summary(&self, lines: &[FeedbackLine], total_rules: usize) -> String {
        let favorable = lines
            .iter()
            .filter(|l| l.outcome == Outcome::Favorable)
            .count();
        let unfavorable = lines.len() - favorable;

        format!(
            "{} of {} rules applied: {} favorable, {} unfavorable.",
            lines.len(),
            total_rules,
            favorable,
            unfavorable
        )
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}
