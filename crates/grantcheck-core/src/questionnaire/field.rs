//! Fields, sections and input domains.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{AnswerInput, AnswerValue};
use crate::rules::Condition;

/// Errors raised when an input does not fit its field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Field {0} is not asked for the current answers")]
    FieldHidden(String),

    #[error("Field {field}: {value:?} is not one of {options:?}")]
    InvalidChoice {
        field: String,
        value: String,
        options: Vec<String>,
    },

    #[error("Field {field}: {value} is below the minimum of {min}")]
    BelowMinimum { field: String, value: f64, min: f64 },

    #[error("Field {field}: {value} is above the maximum of {max}")]
    AboveMaximum { field: String, value: f64, max: f64 },

    #[error("Field {field}: {date} is outside {min}..={max}")]
    DateOutOfRange {
        field: String,
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },

    #[error("Field {field}: cannot read {input:?} as a date (expected YYYY-MM-DD)")]
    InvalidDate { field: String, input: String },

    #[error("Field {field}: expected {expected}, got {input:?}")]
    WrongKind {
        field: String,
        expected: &'static str,
        input: String,
    },
}

/// The set of values a field accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// Exactly one item from a closed list.
    SingleChoice { options: Vec<String> },

    /// Any subset of a closed list.
    MultiChoice { options: Vec<String> },

    Integer {
        #[serde(default)]
        min: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },

    Decimal {
        #[serde(default)]
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },

    /// A calendar date. An absent `max` means "no later than the
    /// evaluation date".
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<NaiveDate>,
    },

    Text {
        #[serde(default)]
        multiline: bool,
    },
}

/// Earliest date accepted when a date domain sets no minimum.
fn earliest_date() -> NaiveDate {
    NaiveDate::MIN
}

impl Domain {
    /// Human-readable description, for prompts and `show`.
    pub fn describe(&self) -> String {
        match self {
            Domain::SingleChoice { options } => format!("one of: {}", options.join(" | ")),
            Domain::MultiChoice { options } => format!("any of: {}", options.join(" | ")),
            Domain::Integer { min, max: None } => format!("whole number >= {}", min),
            Domain::Integer { min, max: Some(max) } => format!("whole number {}..={}", min, max),
            Domain::Decimal { min, step: None } => format!("amount >= {}", min),
            Domain::Decimal { min, step: Some(step) } => {
                format!("amount >= {} in steps of {}", min, step)
            }
            Domain::Date { min, max } => {
                let from = min.map(|d| d.to_string()).unwrap_or_default();
                let to = max
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "evaluation date".to_string());
                format!("date YYYY-MM-DD ({}..{})", from, to)
            }
            Domain::Text { multiline: true } => "text (multiple lines)".to_string(),
            Domain::Text { multiline: false } => "text".to_string(),
        }
    }

    /// Choice options, for choice domains.
    pub fn options(&self) -> &[String] {
        match self {
            Domain::SingleChoice { options } | Domain::MultiChoice { options } => options,
            _ => &[],
        }
    }

    /// Check an input against this domain and type it.
    ///
    /// `latest_date` caps date domains that set no explicit maximum.
    pub fn accept(
        &self,
        field: &str,
        input: AnswerInput,
        latest_date: NaiveDate,
    ) -> Result<AnswerValue, InputError> {
        match self {
            Domain::SingleChoice { options } => {
                let value = expect_text(field, input, "a single choice")?;
                check_choice(field, &value, options)?;
                Ok(AnswerValue::Choice(value))
            }
            Domain::MultiChoice { options } => {
                let items = match input {
                    AnswerInput::Many(items) => items,
                    AnswerInput::Text(item) if item.trim().is_empty() => Vec::new(),
                    AnswerInput::Text(item) => vec![item],
                    other => {
                        return Err(wrong_kind(field, "a list of choices", &other));
                    }
                };
                for item in &items {
                    check_choice(field, item, options)?;
                }
                Ok(AnswerValue::selections(items))
            }
            Domain::Integer { min, max } => {
                let value = match input {
                    AnswerInput::Integer(n) => n,
                    AnswerInput::Decimal(n) if n.fract() == 0.0 => n as i64,
                    AnswerInput::Text(ref s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| wrong_kind(field, "a whole number", &input))?,
                    other => return Err(wrong_kind(field, "a whole number", &other)),
                };
                if value < *min {
                    return Err(InputError::BelowMinimum {
                        field: field.to_string(),
                        value: value as f64,
                        min: *min as f64,
                    });
                }
                if let Some(max) = max {
                    if value > *max {
                        return Err(InputError::AboveMaximum {
                            field: field.to_string(),
                            value: value as f64,
                            max: *max as f64,
                        });
                    }
                }
                Ok(AnswerValue::Integer(value))
            }
            Domain::Decimal { min, .. } => {
                let value = match input {
                    AnswerInput::Integer(n) => n as f64,
                    AnswerInput::Decimal(n) => n,
                    AnswerInput::Text(ref s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| wrong_kind(field, "an amount", &input))?,
                    other => return Err(wrong_kind(field, "an amount", &other)),
                };
                if !value.is_finite() {
                    return Err(wrong_kind(field, "an amount", &AnswerInput::Decimal(value)));
                }
                if value < *min {
                    return Err(InputError::BelowMinimum {
                        field: field.to_string(),
                        value,
                        min: *min,
                    });
                }
                Ok(AnswerValue::Decimal(value))
            }
            Domain::Date { min, max } => {
                let text = expect_text(field, input, "a date")?;
                let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| {
                    InputError::InvalidDate {
                        field: field.to_string(),
                        input: text.clone(),
                    }
                })?;
                let lower = min.unwrap_or_else(earliest_date);
                let upper = max.unwrap_or(latest_date);
                if date < lower || date > upper {
                    return Err(InputError::DateOutOfRange {
                        field: field.to_string(),
                        date,
                        min: lower,
                        max: upper,
                    });
                }
                Ok(AnswerValue::Date(date))
            }
            Domain::Text { .. } => match input {
                AnswerInput::Text(s) => Ok(AnswerValue::Choice(s)),
                AnswerInput::Integer(n) => Ok(AnswerValue::Choice(n.to_string())),
                AnswerInput::Decimal(n) => Ok(AnswerValue::Choice(n.to_string())),
                other => Err(wrong_kind(field, "text", &other)),
            },
        }
    }
}

fn expect_text(field: &str, input: AnswerInput, expected: &'static str) -> Result<String, InputError> {
    match input {
        AnswerInput::Text(s) => Ok(s),
        other => Err(wrong_kind(field, expected, &other)),
    }
}

fn check_choice(field: &str, value: &str, options: &[String]) -> Result<(), InputError> {
    if options.iter().any(|o| o == value) {
        Ok(())
    } else {
        Err(InputError::InvalidChoice {
            field: field.to_string(),
            value: value.to_string(),
            options: options.to_vec(),
        })
    }
}

fn wrong_kind(field: &str, expected: &'static str, input: &AnswerInput) -> InputError {
    InputError::WrongKind {
        field: field.to_string(),
        expected,
        input: format!("{:?}", input),
    }
}

/// A single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Identifier used by rules and answer records
    pub id: String,

    /// Question text shown to the respondent
    pub label: String,

    /// Row label in exports, when it differs from the question text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_label: Option<String>,

    pub domain: Domain,

    /// Asked only while this condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,

    /// Name of a derived answer holding whole-and-fractional years elapsed
    /// between this date and the evaluation date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive_years: Option<String>,
}

impl Field {
    pub fn export_label(&self) -> &str {
        self.export_label.as_deref().unwrap_or(&self.label)
    }

    /// The value an untouched widget would hold: the first option of a
    /// single choice, the minimum of a number, the latest allowed date,
    /// nothing for lists and text.
    pub fn default_input(&self, latest_date: NaiveDate) -> AnswerInput {
        match &self.domain {
            Domain::SingleChoice { options } => {
                AnswerInput::Text(options.first().cloned().unwrap_or_default())
            }
            Domain::MultiChoice { .. } => AnswerInput::Many(Vec::new()),
            Domain::Integer { min, .. } => AnswerInput::Integer(*min),
            Domain::Decimal { min, .. } => AnswerInput::Decimal(*min),
            Domain::Date { max, .. } => {
                AnswerInput::Text(max.unwrap_or(latest_date).format("%Y-%m-%d").to_string())
            }
            Domain::Text { .. } => AnswerInput::Text(String::new()),
        }
    }
}

/// A group of fields shown together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn yes_no() -> Domain {
        Domain::SingleChoice {
            options: vec!["Yes".to_string(), "No".to_string()],
        }
    }

    #[test]
    fn test_single_choice_rejects_unknown_option() {
        let today = date(2025, 4, 15);
        assert_eq!(
            yes_no().accept("need", AnswerInput::text("Yes"), today).unwrap(),
            AnswerValue::Choice("Yes".to_string())
        );
        let err = yes_no()
            .accept("need", AnswerInput::text("Maybe"), today)
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidChoice { .. }));
    }

    #[test]
    fn test_multi_choice_collapses_duplicates() {
        let domain = Domain::MultiChoice {
            options: vec!["Capital".to_string(), "Training".to_string()],
        };
        let value = domain
            .accept(
                "uses",
                AnswerInput::many(["Training", "Capital", "Training"]),
                date(2025, 4, 15),
            )
            .unwrap();
        assert_eq!(
            value.as_selections().unwrap(),
            &["Training".to_string(), "Capital".to_string()]
        );
    }

    #[test]
    fn test_integer_lower_bound() {
        let domain = Domain::Integer { min: 0, max: None };
        let today = date(2025, 4, 15);
        assert_eq!(
            domain.accept("jobs", AnswerInput::text(" 7 "), today).unwrap(),
            AnswerValue::Integer(7)
        );
        assert!(matches!(
            domain.accept("jobs", AnswerInput::Integer(-1), today),
            Err(InputError::BelowMinimum { .. })
        ));
        assert!(matches!(
            domain.accept("jobs", AnswerInput::Decimal(2.5), today),
            Err(InputError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_decimal_accepts_integers() {
        let domain = Domain::Decimal { min: 0.0, step: Some(0.5) };
        assert_eq!(
            domain
                .accept("wage", AnswerInput::Integer(20), date(2025, 4, 15))
                .unwrap(),
            AnswerValue::Decimal(20.0)
        );
    }

    #[test]
    fn test_describe_shows_decimal_step() {
        let revenue = Domain::Decimal { min: 0.0, step: Some(1000.0) };
        assert_eq!(revenue.describe(), "amount >= 0 in steps of 1000");
        let wage = Domain::Decimal { min: 0.0, step: Some(0.5) };
        assert_eq!(wage.describe(), "amount >= 0 in steps of 0.5");
        let open = Domain::Decimal { min: 1.5, step: None };
        assert_eq!(open.describe(), "amount >= 1.5");
    }

    #[test]
    fn test_date_capped_by_evaluation_date() {
        let domain = Domain::Date { min: None, max: None };
        let today = date(2025, 4, 15);
        assert_eq!(
            domain
                .accept("start_date", AnswerInput::text("2025-04-15"), today)
                .unwrap(),
            AnswerValue::Date(today)
        );
        assert!(matches!(
            domain.accept("start_date", AnswerInput::text("2025-04-16"), today),
            Err(InputError::DateOutOfRange { .. })
        ));
        assert!(matches!(
            domain.accept("start_date", AnswerInput::text("April 2020"), today),
            Err(InputError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_default_inputs_match_untouched_widgets() {
        let today = date(2025, 4, 15);
        let field = Field {
            id: "need".to_string(),
            label: "Need?".to_string(),
            export_label: None,
            domain: yes_no(),
            visible_when: None,
            derive_years: None,
        };
        assert_eq!(field.default_input(today), AnswerInput::text("Yes"));
        assert_eq!(field.export_label(), "Need?");

        let start = Field {
            domain: Domain::Date { min: None, max: None },
            ..field
        };
        assert_eq!(start.default_input(today), AnswerInput::text("2025-04-15"));
    }
}
