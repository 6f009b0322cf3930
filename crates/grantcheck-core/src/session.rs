//! One respondent's pass through a questionnaire.
//!
//! A session owns the answer record. Sections may be visited in any order;
//! the results step comes after the last section. Nested sub-questions are
//! asked only while their `visible_when` condition holds, and an answer
//! that hides a sub-question also forgets the sub-question's answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::answers::{AnswerInput, AnswerRecord};
use crate::builtin;
use crate::config::{years_between, EvaluationConfig};
use crate::export::ExportRecord;
use crate::questionnaire::{Domain, Field, InputError, Questionnaire, Section};
use crate::types::Assessment;
use crate::EvaluationError;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Index into the questionnaire's sections
    Section(usize),
    Results,
}

/// An in-progress questionnaire.
#[derive(Debug, Clone)]
pub struct Session {
    questionnaire: Arc<Questionnaire>,
    config: EvaluationConfig,
    answers: AnswerRecord,
    step: Step,
}

impl Session {
    pub fn new(questionnaire: impl Into<Arc<Questionnaire>>, config: EvaluationConfig) -> Self {
        Self {
            questionnaire: questionnaire.into(),
            config,
            answers: AnswerRecord::new(),
            step: Step::Section(0),
        }
    }

    /// Start a session on a built-in or on-disk questionnaire, with
    /// `inputs` already loaded.
    pub fn open(
        name_or_path: &str,
        config: EvaluationConfig,
        inputs: BTreeMap<String, AnswerInput>,
    ) -> Result<Self, EvaluationError> {
        let mut session = Self::new(builtin::resolve(name_or_path)?, config);
        session.load_answers(inputs)?;
        Ok(session)
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn sections(&self) -> &[Section] {
        &self.questionnaire.sections
    }

    pub fn current_step(&self) -> Step {
        self.step
    }

    /// The section being shown, or `None` on the results step.
    pub fn current_section(&self) -> Option<&Section> {
        match self.step {
            Step::Section(index) => self.questionnaire.sections.get(index),
            Step::Results => None,
        }
    }

    /// Move to any step. Out-of-range section indexes land on results.
    pub fn jump_to(&mut self, step: Step) {
        self.step = match step {
            Step::Section(index) if index < self.questionnaire.sections.len() => step,
            _ => Step::Results,
        };
    }

    pub fn jump_to_section(&mut self, section_id: &str) -> Result<(), InputError> {
        let index = self
            .questionnaire
            .sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or_else(|| InputError::UnknownSection(section_id.to_string()))?;
        self.step = Step::Section(index);
        Ok(())
    }

    /// Move to the following step. Stays on results once there.
    pub fn advance(&mut self) {
        if let Step::Section(index) = self.step {
            self.jump_to(Step::Section(index + 1));
        }
    }

    /// True if `field` is asked given the answers so far.
    pub fn is_visible(&self, field: &Field) -> bool {
        field
            .visible_when
            .as_ref()
            .map_or(true, |condition| condition.holds(&self.answers))
    }

    /// Fields of `section` that are asked given the answers so far.
    pub fn visible_fields<'a>(&self, section: &'a Section) -> Vec<&'a Field> {
        section.fields.iter().filter(|f| self.is_visible(f)).collect()
    }

    /// Check `input` against the field's domain and store it, along with
    /// any value derived from it.
    pub fn answer(&mut self, field_id: &str, input: AnswerInput) -> Result<(), InputError> {
        let questionnaire = Arc::clone(&self.questionnaire);
        let field = questionnaire
            .field(field_id)
            .ok_or_else(|| InputError::UnknownField(field_id.to_string()))?;

        if !self.is_visible(field) {
            return Err(InputError::FieldHidden(field_id.to_string()));
        }

        if matches!(field.domain, Domain::Date { .. }) && input.is_blank() {
            self.answers.remove(&field.id);
            if let Some(derived) = &field.derive_years {
                tracing::warn!(
                    field = %field.id,
                    derived = %derived,
                    "No date given; counting zero years"
                );
                self.answers.set(derived.clone(), 0.0);
            }
            self.prune_hidden();
            return Ok(());
        }

        let value = match field.domain.accept(&field.id, input, self.config.evaluation_date) {
            Ok(value) => value,
            Err(InputError::InvalidDate { input, .. }) if field.derive_years.is_some() => {
                self.answers.remove(&field.id);
                if let Some(derived) = &field.derive_years {
                    tracing::warn!(
                        field = %field.id,
                        derived = %derived,
                        input = %input,
                        "Unreadable date; counting zero years"
                    );
                    self.answers.set(derived.clone(), 0.0);
                }
                self.prune_hidden();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Some(derived) = &field.derive_years {
            let years = years_between(value.as_date(), self.config.evaluation_date);
            self.answers.set(derived.clone(), years);
        }

        tracing::debug!(field = %field.id, value = %value, "Answer recorded");
        self.answers.set(field.id.clone(), value);
        self.prune_hidden();
        Ok(())
    }

    /// Answer several fields at once.
    ///
    /// Answers are applied in questionnaire order, so a sub-question may be
    /// given together with the answer that reveals it. Nothing is stored
    /// unless every answer is accepted.
    pub fn load_answers(&mut self, inputs: BTreeMap<String, AnswerInput>) -> Result<(), InputError> {
        if let Some(unknown) = inputs.keys().find(|id| self.questionnaire.field(id).is_none()) {
            return Err(InputError::UnknownField(unknown.clone()));
        }

        let questionnaire = Arc::clone(&self.questionnaire);
        let mut staged = self.clone();
        let mut inputs = inputs;
        for field in questionnaire.fields() {
            if let Some(input) = inputs.remove(&field.id) {
                staged.answer(&field.id, input)?;
            }
        }
        *self = staged;
        Ok(())
    }

    /// Forget answers to fields that are no longer asked.
    fn prune_hidden(&mut self) {
        let questionnaire = Arc::clone(&self.questionnaire);
        loop {
            let hidden: Vec<&Field> = questionnaire
                .fields()
                .filter(|f| self.answers.is_answered(&f.id) && !self.is_visible(f))
                .collect();
            if hidden.is_empty() {
                break;
            }
            for field in hidden {
                tracing::debug!(field = %field.id, "Answer dropped; field is hidden");
                self.answers.remove(&field.id);
                if let Some(derived) = &field.derive_years {
                    self.answers.remove(derived);
                }
            }
        }
    }

    /// Evaluate the rule catalog against the current answers.
    pub fn results(&self) -> Assessment {
        crate::evaluate_with_config(&self.questionnaire, &self.answers, &self.config)
    }

    /// Snapshot the answers for download.
    pub fn export(&self) -> ExportRecord {
        ExportRecord::from_answers(&self.questionnaire, &self.answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;
    use crate::builtin;
    use chrono::NaiveDate;

    fn federal() -> Session {
        let config = EvaluationConfig::new(NaiveDate::from_ymd_opt(2025, 4, 15).unwrap());
        Session::new(builtin::load("federal").unwrap(), config)
    }

    #[test]
    fn test_navigation() {
        let mut session = federal();
        assert_eq!(session.current_step(), Step::Section(0));
        assert_eq!(session.current_section().unwrap().id, "location");

        session.jump_to_section("matching").unwrap();
        assert_eq!(session.current_section().unwrap().id, "matching");
        session.advance();
        assert_eq!(session.current_step(), Step::Results);
        assert!(session.current_section().is_none());
        session.advance();
        assert_eq!(session.current_step(), Step::Results);

        session.jump_to(Step::Section(2));
        assert_eq!(session.current_section().unwrap().id, "size");
        session.jump_to(Step::Section(99));
        assert_eq!(session.current_step(), Step::Results);

        assert_eq!(
            session.jump_to_section("budget"),
            Err(InputError::UnknownSection("budget".to_string()))
        );
    }

    #[test]
    fn test_sub_questions_follow_parent() {
        let mut session = federal();
        let location = session.sections()[0].clone();
        let ids = |s: &Session| -> Vec<String> {
            s.visible_fields(&location).iter().map(|f| f.id.clone()).collect()
        };

        assert_eq!(ids(&session), vec!["us_located"]);
        assert_eq!(
            session.answer("rural", AnswerInput::text("Yes")),
            Err(InputError::FieldHidden("rural".to_string()))
        );

        session.answer("us_located", AnswerInput::text("Yes")).unwrap();
        assert_eq!(ids(&session), vec!["us_located", "rural", "distressed"]);
        session.answer("rural", AnswerInput::text("Yes")).unwrap();
        assert!(session.answers().is_answered("rural"));

        session.answer("us_located", AnswerInput::text("No")).unwrap();
        assert_eq!(ids(&session), vec!["us_located"]);
        assert!(!session.answers().is_answered("rural"));
    }

    #[test]
    fn test_date_answer_derives_years() {
        let mut session = federal();
        session
            .answer("start_date", AnswerInput::text("2005-04-15"))
            .unwrap();
        assert_eq!(session.answers().value("years"), Some(&AnswerValue::Decimal(20.0)));

        session.answer("start_date", AnswerInput::text("")).unwrap();
        assert!(!session.answers().is_answered("start_date"));
        assert_eq!(session.answers().value("years"), Some(&AnswerValue::Decimal(0.0)));
    }

    #[test]
    fn test_unreadable_date_counts_zero_years() {
        let mut session = federal();
        session
            .answer("start_date", AnswerInput::text("2005-04-15"))
            .unwrap();
        session
            .answer("start_date", AnswerInput::text("April 2020"))
            .unwrap();

        assert!(!session.answers().is_answered("start_date"));
        assert_eq!(session.answers().value("years"), Some(&AnswerValue::Decimal(0.0)));
        let results = session.results();
        assert!(results.fired("TIME2"));
        assert!(!results.fired("TIME1"));
    }

    #[test]
    fn test_future_date_rejected() {
        let mut session = federal();
        let err = session
            .answer("start_date", AnswerInput::text("2025-04-16"))
            .unwrap_err();
        assert!(matches!(err, InputError::DateOutOfRange { .. }));
        assert!(!session.answers().is_answered("years"));
    }

    #[test]
    fn test_invalid_inputs_leave_record_untouched() {
        let mut session = federal();
        assert!(matches!(
            session.answer("industry", AnswerInput::text("Retail")),
            Err(InputError::InvalidChoice { .. })
        ));
        assert!(matches!(
            session.answer("employees", AnswerInput::Integer(-1)),
            Err(InputError::BelowMinimum { .. })
        ));
        assert_eq!(
            session.answer("headcount", AnswerInput::Integer(3)),
            Err(InputError::UnknownField("headcount".to_string()))
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_load_answers_applies_in_field_order() {
        let mut session = federal();
        let mut inputs = BTreeMap::new();
        // "distressed" sorts before "us_located" but depends on it
        inputs.insert("distressed".to_string(), AnswerInput::text("Yes"));
        inputs.insert("us_located".to_string(), AnswerInput::text("Yes"));
        inputs.insert("employees".to_string(), AnswerInput::Integer(10));

        session.load_answers(inputs).unwrap();
        assert_eq!(session.answers().len(), 3);
        assert!(session.results().fired("LOC3"));
    }

    #[test]
    fn test_load_answers_checks_ids_first() {
        let mut session = federal();
        let mut inputs = BTreeMap::new();
        inputs.insert("employees".to_string(), AnswerInput::Integer(10));
        inputs.insert("zzz".to_string(), AnswerInput::Integer(1));

        assert_eq!(
            session.load_answers(inputs),
            Err(InputError::UnknownField("zzz".to_string()))
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_load_answers_accepts_unreadable_date() {
        let mut session = federal();
        let mut inputs = BTreeMap::new();
        inputs.insert("employees".to_string(), AnswerInput::Integer(10));
        inputs.insert("start_date".to_string(), AnswerInput::text("04/15/2020"));

        session.load_answers(inputs).unwrap();
        assert_eq!(session.answers().value("years"), Some(&AnswerValue::Decimal(0.0)));
        assert!(session.results().fired("SIZE1"));
    }

    #[test]
    fn test_load_answers_is_all_or_nothing() {
        let mut session = federal();
        let mut inputs = BTreeMap::new();
        inputs.insert("employees".to_string(), AnswerInput::Integer(10));
        inputs.insert("industry".to_string(), AnswerInput::text("Retail"));

        assert!(matches!(
            session.load_answers(inputs),
            Err(InputError::InvalidChoice { .. })
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_export_covers_every_field() {
        let mut session = federal();
        session.answer("employees", AnswerInput::Integer(10)).unwrap();
        let record = session.export();
        assert_eq!(record.len(), session.questionnaire().fields().count());
        let employees = record
            .rows()
            .iter()
            .find(|r| r.label == "FTE employees:")
            .unwrap();
        assert_eq!(employees.value, "10");
    }
}
