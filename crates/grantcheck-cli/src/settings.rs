//! Settings file for the CLI.
//!
//! ```yaml
//! as_of: "2025-04-15"
//! questionnaire: "minnesota"
//! format: "json"
//! ```
//!
//! Command-line flags take precedence over the file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use grantcheck_core::config::parse_date;

use crate::report::ReportFormat;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Evaluation date, `YYYY-MM-DD`
    pub as_of: Option<String>,

    /// Built-in questionnaire name or path
    pub questionnaire: Option<String>,

    /// Output format for `evaluate`
    pub format: Option<ReportFormat>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The evaluation date: the flag, else the file, else today.
    pub fn evaluation_date(&self, flag: Option<&str>) -> Result<Option<NaiveDate>> {
        match flag.or(self.as_of.as_deref()) {
            Some(value) => Ok(Some(parse_date(value)?)),
            None => Ok(None),
        }
    }

    /// The questionnaire to use: the flag, else the file.
    pub fn questionnaire<'a>(&'a self, flag: Option<&'a str>) -> Result<&'a str> {
        flag.or(self.questionnaire.as_deref()).context(
            "No questionnaire given; pass -q <name|path> or set `questionnaire` in the settings file",
        )
    }

    pub fn format(&self, flag: Option<ReportFormat>) -> ReportFormat {
        flag.or(self.format).unwrap_or_default()
    }
}
