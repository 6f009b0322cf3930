//! Evaluation configuration.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format accepted everywhere a date is configured.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Settings for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// The "as of" date: derived years are measured up to it and date
    /// inputs may not be later than it.
    pub evaluation_date: NaiveDate,

    /// Attach the questionnaire's next-steps note to non-empty results
    #[serde(default = "default_true")]
    pub include_next_steps: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            evaluation_date: Local::now().date_naive(),
            include_next_steps: true,
        }
    }
}

impl EvaluationConfig {
    /// Create a config evaluated as of `evaluation_date`.
    pub fn new(evaluation_date: NaiveDate) -> Self {
        Self {
            evaluation_date,
            ..Default::default()
        }
    }

    pub fn with_next_steps(mut self, include: bool) -> Self {
        self.include_next_steps = include;
        self
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

/// Years elapsed between `start` and `reference`, as days / 365.25.
///
/// A missing start date counts as zero years.
pub fn years_between(start: Option<NaiveDate>, reference: NaiveDate) -> f64 {
    match start {
        Some(start) => (reference - start).num_days() as f64 / 365.25,
        None => 0.0,
    }
}
