//! # grantcheck-core
//!
//! Deterministic grant-eligibility questionnaire engine.
//!
//! This crate provides the core logic for grantcheck:
//! - What does the questionnaire ask, and which inputs are valid?
//! - Which eligibility criteria do the answers meet or miss?
//! - How are the answers exported for a grant application?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same answers and evaluation date always produce the same lines
//! 2. **Independent rules**: No rule reads another rule's result
//! 3. **Traceable**: Every feedback line cites its rule id and the answers it read
//! 4. **Declarative**: Jurisdictions differ only in their questionnaire documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use grantcheck_core::{builtin, AnswerInput, EvaluationConfig, Session};
//!
//! let questionnaire = builtin::load("federal")?;
//! let mut session = Session::new(questionnaire, EvaluationConfig::default());
//! session.answer("employees", AnswerInput::Integer(10))?;
//!
//! let assessment = session.results();
//! for line in &assessment.lines {
//!     println!("{}", line);
//! }
//! ```

pub mod answers;
pub mod builtin;
pub mod config;
pub mod evidence;
pub mod export;
pub mod questionnaire;
pub mod rules;
pub mod session;
pub mod synthesizer;
pub mod types;

// Re-export main types at crate root
pub use answers::{AnswerInput, AnswerRecord, AnswerValue};
pub use config::{ConfigError, EvaluationConfig};
pub use evidence::Evidence;
pub use export::{Attachment, ExportError, ExportRecord, ExportRow};
pub use questionnaire::{
    Domain, ExportSettings, Field, InputError, OutputMode, Questionnaire, QuestionnaireError,
    Section,
};
pub use rules::{CompareOp, Condition, Rule};
pub use session::{Session, Step};
pub use synthesizer::Synthesizer;
pub use types::{Assessment, EvaluationRequest, EvidenceSource, FeedbackLine, Outcome};

use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while loading a questionnaire and its answers.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Questionnaire error: {0}")]
    Questionnaire(#[from] QuestionnaireError),

    #[error("Invalid answer: {0}")]
    Input(#[from] InputError),
}

/// Evaluate answers against a questionnaire's rule catalog, as of today.
///
/// This is the main entry point for eligibility evaluation.
///
/// # Arguments
///
/// * `questionnaire` - The questionnaire defining the rules
/// * `answers` - The respondent's answers
///
/// # Returns
///
/// An `Assessment` containing:
/// - `lines`: One feedback line per rule that fired, in catalog order
/// - `next_steps` or `notice`: Fixed closing text
/// - `summary`: Counts of favorable and unfavorable lines
/// - `evaluated_at`: Timestamp of evaluation
pub fn evaluate(questionnaire: &Questionnaire, answers: &AnswerRecord) -> Assessment {
    evaluate_with_config(questionnaire, answers, &EvaluationConfig::default())
}

/// Evaluate with explicit settings.
///
/// Values derived from a stored date (such as years in operation) are
/// recomputed as of `config.evaluation_date`. A derived value with no
/// stored date behind it is used as given.
pub fn evaluate_with_config(
    questionnaire: &Questionnaire,
    answers: &AnswerRecord,
    config: &EvaluationConfig,
) -> Assessment {
    let refreshed = refresh_derived(questionnaire, answers, config.evaluation_date);
    let answers: &AnswerRecord = &refreshed;
    let request = EvaluationRequest::new(questionnaire, answers, config);

    let lines: Vec<FeedbackLine> = questionnaire
        .rules
        .iter()
        .filter_map(|rule| rule.evaluate(&request))
        .collect();

    let assessment = Synthesizer::new().synthesize(lines, questionnaire, config);

    tracing::info!(
        questionnaire = %questionnaire.name,
        evaluation_date = %config.evaluation_date,
        answered = answers.len(),
        fired = assessment.lines.len(),
        "Evaluation complete"
    );

    assessment
}

/// Load a built-in or on-disk questionnaire, check every answer in
/// `inputs` against it and evaluate.
pub fn assess(
    name_or_path: &str,
    inputs: BTreeMap<String, AnswerInput>,
    config: EvaluationConfig,
) -> Result<Assessment, EvaluationError> {
    Ok(Session::open(name_or_path, config, inputs)?.results())
}

fn refresh_derived<'a>(
    questionnaire: &Questionnaire,
    answers: &'a AnswerRecord,
    as_of: NaiveDate,
) -> Cow<'a, AnswerRecord> {
    let mut refreshed = Cow::Borrowed(answers);
    for field in questionnaire.fields() {
        let start = answers.value(&field.id).and_then(AnswerValue::as_date);
        if let (Some(derived), Some(start)) = (&field.derive_years, start) {
            let years = AnswerValue::Decimal(config::years_between(Some(start), as_of));
            if answers.value(derived) != Some(&years) {
                tracing::debug!(field = %derived, as_of = %as_of, "Derived value recomputed");
                refreshed.to_mut().set(derived.clone(), years);
            }
        }
    }
    refreshed
}
