//! Questionnaire parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::field::{Domain, Field, Section};
use super::schema::validate_questionnaire_schema;
use crate::rules::Rule;

/// Errors that can occur when loading questionnaires.
#[derive(Error, Debug)]
pub enum QuestionnaireError {
    #[error("Failed to read questionnaire file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Questionnaire does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Questionnaire validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown questionnaire: {0}")]
    UnknownQuestionnaire(String),
}

/// What the final step of a questionnaire produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Evaluate the rule catalog and show feedback lines
    #[default]
    Feedback,
    /// Offer the answers as a CSV download
    Export,
}

/// Fixed text shown on the results step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsText {
    /// Shown after the feedback lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,

    /// Shown when no rule fired
    #[serde(default = "default_incomplete_notice")]
    pub incomplete_notice: String,
}

fn default_incomplete_notice() -> String {
    "Please complete all sections to see your results.".to_string()
}

impl Default for ResultsText {
    fn default() -> Self {
        Self {
            next_steps: None,
            incomplete_notice: default_incomplete_notice(),
        }
    }
}

/// Settings for the CSV download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_filename")]
    pub filename: String,

    #[serde(default = "default_link_text")]
    pub link_text: String,
}

fn default_filename() -> String {
    "grant_data.csv".to_string()
}

fn default_link_text() -> String {
    "Download CSV File".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            link_text: default_link_text(),
        }
    }
}

/// A questionnaire: its sections, input domains and rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    /// Version of the questionnaire schema
    pub schema_version: String,

    /// Short identifier (e.g., "federal")
    pub name: String,

    /// Human-readable title
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Jurisdiction the rules describe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,

    #[serde(default)]
    pub output: OutputMode,

    /// Sections in display order
    pub sections: Vec<Section>,

    /// Rule catalog in evaluation order
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub results: ResultsText,

    #[serde(default)]
    pub export: ExportSettings,
}

impl Questionnaire {
    /// Parse a questionnaire from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, QuestionnaireError> {
        let document: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_document(document)
    }

    /// Parse a questionnaire from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, QuestionnaireError> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Parse a questionnaire file; `.json` files are read as JSON,
    /// anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QuestionnaireError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    fn from_document(document: serde_json::Value) -> Result<Self, QuestionnaireError> {
        validate_questionnaire_schema(&document).map_err(QuestionnaireError::SchemaViolation)?;
        let questionnaire: Questionnaire = serde_json::from_value(document)?;
        questionnaire.validate()?;
        tracing::debug!(
            name = %questionnaire.name,
            sections = questionnaire.sections.len(),
            rules = questionnaire.rules.len(),
            "Questionnaire loaded"
        );
        Ok(questionnaire)
    }

    /// Validate the questionnaire's internal consistency.
    fn validate(&self) -> Result<(), QuestionnaireError> {
        if self.name.is_empty() {
            return Err(QuestionnaireError::MissingField("name".to_string()));
        }

        if self.title.is_empty() {
            return Err(QuestionnaireError::MissingField("title".to_string()));
        }

        self.validate_unique_ids()?;
        self.validate_derived_fields()?;
        self.validate_references()?;

        Ok(())
    }

    /// Ensure section, field and rule ids are unique.
    fn validate_unique_ids(&self) -> Result<(), QuestionnaireError> {
        let mut sections = HashSet::new();
        for section in &self.sections {
            if !sections.insert(&section.id) {
                return Err(QuestionnaireError::ValidationError(format!(
                    "Duplicate section ID: {}",
                    section.id
                )));
            }
        }

        let mut fields = HashSet::new();
        for field in self.fields() {
            if !fields.insert(&field.id) {
                return Err(QuestionnaireError::ValidationError(format!(
                    "Duplicate field ID: {}",
                    field.id
                )));
            }
        }

        let mut rules = HashSet::new();
        for rule in &self.rules {
            if !rules.insert(&rule.id) {
                return Err(QuestionnaireError::ValidationError(format!(
                    "Duplicate rule ID: {}",
                    rule.id
                )));
            }
        }

        Ok(())
    }

    /// Derived values come from date fields and must not shadow a field.
    fn validate_derived_fields(&self) -> Result<(), QuestionnaireError> {
        for field in self.fields() {
            let Some(target) = &field.derive_years else {
                continue;
            };
            if !matches!(field.domain, Domain::Date { .. }) {
                return Err(QuestionnaireError::ValidationError(format!(
                    "Field {} derives years but is not a date",
                    field.id
                )));
            }
            if self.field(target).is_some() {
                return Err(QuestionnaireError::ValidationError(format!(
                    "Derived value {} of field {} collides with a field ID",
                    target, field.id
                )));
            }
        }
        Ok(())
    }

    /// Rules and visibility conditions may only read known answers, and
    /// may only compare choices against the field's own options.
    fn validate_references(&self) -> Result<(), QuestionnaireError> {
        for field in self.fields() {
            if let Some(condition) = &field.visible_when {
                for name in condition.fields() {
                    if self.field(name).is_none() {
                        return Err(QuestionnaireError::ValidationError(format!(
                            "Field {} is shown depending on unknown field {}",
                            field.id, name
                        )));
                    }
                }
                self.check_literals(&field.id, condition.choice_literals())?;
            }
        }

        for rule in &self.rules {
            for name in rule.fields() {
                if !self.is_known_answer(name) {
                    return Err(QuestionnaireError::ValidationError(format!(
                        "Rule {} reads unknown field {}",
                        rule.id, name
                    )));
                }
            }
            self.check_literals(&rule.id, rule.when.choice_literals())?;
        }

        Ok(())
    }

    fn check_literals(&self, owner: &str, literals: Vec<(&str, &str)>) -> Result<(), QuestionnaireError> {
        for (name, literal) in literals {
            let Some(field) = self.field(name) else {
                continue;
            };
            let options = field.domain.options();
            if !options.is_empty() && !options.iter().any(|o| o == literal) {
                return Err(QuestionnaireError::ValidationError(format!(
                    "{} compares field {} against {:?}, which is not one of its options",
                    owner, name, literal
                )));
            }
        }
        Ok(())
    }

    /// All fields in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Look up a field by id.
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }

    /// Look up a section by id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The date field a derived value is computed from, if `name` is
    /// derived.
    pub fn derived_from(&self, name: &str) -> Option<&str> {
        self.fields()
            .find(|f| f.derive_years.as_deref() == Some(name))
            .map(|f| f.id.as_str())
    }

    /// True for field ids and derived value names.
    pub fn is_known_answer(&self, name: &str) -> bool {
        self.field(name).is_some() || self.derived_from(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_QUESTIONNAIRE: &str = r#"
schema_version: "1.0"
name: "test"
title: "Test Questionnaire"
sections:
  - id: "location"
    title: "Location"
    fields:
      - id: "located"
        label: "Located here?"
        domain: { type: "single_choice", options: ["Yes", "No"] }
      - id: "rural"
        label: "Rural?"
        domain: { type: "single_choice", options: ["Yes", "No", "Unsure"] }
        visible_when: { equals: { field: "located", value: "Yes" } }
  - id: "time"
    title: "Time"
    fields:
      - id: "start_date"
        label: "Start date"
        domain: { type: "date" }
        derive_years: "years"
rules:
  - id: "LOC1"
    when: { equals: { field: "located", value: "Yes" } }
    message: "Located."
  - id: "TIME1"
    when: { compare: { field: "years", op: "ge", value: 1 } }
    message: "{years:.1} years."
"#;

    #[test]
    fn test_parse_valid_questionnaire() {
        let questionnaire = Questionnaire::from_yaml(VALID_QUESTIONNAIRE).unwrap();
        assert_eq!(questionnaire.name, "test");
        assert_eq!(questionnaire.sections.len(), 2);
        assert_eq!(questionnaire.rules.len(), 2);
        assert_eq!(questionnaire.output, OutputMode::Feedback);
        assert_eq!(questionnaire.export.filename, "grant_data.csv");
        assert_eq!(
            questionnaire.results.incomplete_notice,
            "Please complete all sections to see your results."
        );
    }

    #[test]
    fn test_lookup_helpers() {
        let questionnaire = Questionnaire::from_yaml(VALID_QUESTIONNAIRE).unwrap();
        let ids: Vec<&str> = questionnaire.fields().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["located", "rural", "start_date"]);
        assert_eq!(questionnaire.derived_from("years"), Some("start_date"));
        assert!(questionnaire.is_known_answer("years"));
        assert!(!questionnaire.is_known_answer("revenue"));
        assert_eq!(questionnaire.section("time").unwrap().title, "Time");
    }

    #[test]
    fn test_json_equivalent() {
        let yaml = Questionnaire::from_yaml(VALID_QUESTIONNAIRE).unwrap();
        let json = serde_json::to_string(&yaml).unwrap();
        let back = Questionnaire::from_json(&json).unwrap();
        assert_eq!(back, yaml);
    }

    #[test]
    fn test_schema_violation() {
        let result = Questionnaire::from_yaml(
            r#"
schema_version: "1.0"
name: "Test"
title: "Bad name casing"
sections: []
"#,
        );
        assert!(matches!(result, Err(QuestionnaireError::SchemaViolation(_))));
    }

    #[test]
    fn test_duplicate_field_ids() {
        let yaml = VALID_QUESTIONNAIRE.replace("id: \"rural\"", "id: \"located\"");
        let result = Questionnaire::from_yaml(&yaml);
        assert!(matches!(result, Err(QuestionnaireError::ValidationError(_))));
    }

    #[test]
    fn test_duplicate_rule_ids() {
        let yaml = VALID_QUESTIONNAIRE.replace("id: \"TIME1\"", "id: \"LOC1\"");
        let result = Questionnaire::from_yaml(&yaml);
        assert!(matches!(result, Err(QuestionnaireError::ValidationError(_))));
    }

    #[test]
    fn test_rule_reading_unknown_field() {
        let yaml = VALID_QUESTIONNAIRE.replace("field: \"years\"", "field: \"age\"");
        let err = Questionnaire::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Rule TIME1 reads unknown field age"));
    }

    #[test]
    fn test_literal_outside_options() {
        let yaml = VALID_QUESTIONNAIRE.replace(
            "when: { equals: { field: \"located\", value: \"Yes\" } }",
            "when: { equals: { field: \"located\", value: \"Maybe\" } }",
        );
        let err = Questionnaire::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("not one of its options"));
    }

    #[test]
    fn test_derived_name_collides_with_field() {
        let yaml = VALID_QUESTIONNAIRE.replace("derive_years: \"years\"", "derive_years: \"located\"");
        let result = Questionnaire::from_yaml(&yaml);
        assert!(matches!(result, Err(QuestionnaireError::ValidationError(_))));
    }
}
