//! Rendering of assessments, questionnaires and exports.

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt::Write as _;

use grantcheck_core::{Assessment, ExportRecord, ExportSettings, OutputMode, Questionnaire};

/// How `evaluate` prints an assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// How `export` encodes the answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Plain CSV text
    #[default]
    Csv,
    /// `data:text/csv;base64,...`
    DataUri,
    /// An HTML download link
    Html,
}

pub fn render_assessment(
    assessment: &Assessment,
    questionnaire: &Questionnaire,
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(assessment)?),
        ReportFormat::Text => Ok(assessment_text(assessment, questionnaire)),
    }
}

fn assessment_text(assessment: &Assessment, questionnaire: &Questionnaire) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (as of {})",
        questionnaire.title, assessment.evaluation_date
    );
    let _ = writeln!(out);

    if let Some(notice) = &assessment.notice {
        let _ = writeln!(out, "{}", notice);
        return out;
    }

    for line in &assessment.lines {
        let _ = writeln!(out, "{}", line);
    }
    if let Some(next_steps) = &assessment.next_steps {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", next_steps);
    }
    out
}

pub fn render_export(
    record: &ExportRecord,
    settings: &ExportSettings,
    format: ExportFormat,
) -> Result<String> {
    let rendered = match format {
        ExportFormat::Csv => record.to_csv()?,
        ExportFormat::DataUri => record.attachment(settings)?.data_uri() + "\n",
        ExportFormat::Html => record.attachment(settings)?.html_link(&settings.link_text) + "\n",
    };
    Ok(rendered)
}

/// Sections, fields and rules of a questionnaire, for `show`.
pub fn describe_questionnaire(questionnaire: &Questionnaire) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", questionnaire.title, questionnaire.name);
    if let Some(jurisdiction) = &questionnaire.jurisdiction {
        let _ = writeln!(out, "Jurisdiction: {}", jurisdiction);
    }
    if let Some(description) = &questionnaire.description {
        let _ = writeln!(out, "{}", description);
    }

    for (index, section) in questionnaire.sections.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {}", index + 1, section.title);
        for field in &section.fields {
            let _ = writeln!(out, "   {} - {}", field.id, field.label);
            let _ = writeln!(out, "      {}", field.domain.describe());
            if let Some(condition) = &field.visible_when {
                let _ = writeln!(out, "      asked after: {}", condition.fields().join(", "));
            }
            if let Some(derived) = &field.derive_years {
                let _ = writeln!(out, "      derives: {} (years)", derived);
            }
        }
    }

    let _ = writeln!(out);
    match questionnaire.output {
        OutputMode::Feedback => {
            let _ = writeln!(out, "Rules: {}", questionnaire.rules.len());
            for rule in &questionnaire.rules {
                let _ = writeln!(
                    out,
                    "   {} {} reads {}",
                    rule.outcome.symbol(),
                    rule.id,
                    rule.fields().join(", ")
                );
            }
        }
        OutputMode::Export => {
            let _ = writeln!(out, "Output: {}", questionnaire.export.filename);
        }
    }
    out
}
