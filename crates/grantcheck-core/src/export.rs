//! CSV export of an answer record.
//!
//! The export is a two-column table, `Section,Input`, with one row per
//! registered field. It is offered as a downloadable attachment encoded
//! into a `data:` URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::AnswerRecord;
use crate::questionnaire::{ExportSettings, Questionnaire};

/// Column headers of the exported CSV.
pub const CSV_HEADERS: [&str; 2] = ["Section", "Input"];

/// Media type of the exported attachment.
pub const MEDIA_TYPE: &str = "text/csv";

/// Errors from encoding or decoding an export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to finish CSV output: {0}")]
    Flush(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unexpected CSV header: {0:?}")]
    Header(Vec<String>),
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub label: String,
    pub value: String,
}

/// A snapshot of an answer record, ready to encode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    rows: Vec<ExportRow>,
}

impl ExportRecord {
    /// Snapshot `answers` in the questionnaire's field order. Fields with
    /// no answer export as empty strings.
    pub fn from_answers(questionnaire: &Questionnaire, answers: &AnswerRecord) -> Self {
        let rows = questionnaire
            .fields()
            .map(|field| ExportRow {
                label: field.export_label().to_string(),
                value: answers
                    .value(&field.id)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Encode as CSV text with a `Section,Input` header.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer.write_record(CSV_HEADERS)?;
        for row in &self.rows {
            writer.write_record([row.label.as_str(), row.value.as_str()])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Flush(e.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Decode CSV text produced by [`ExportRecord::to_csv`].
    pub fn from_csv(text: &str) -> Result<Self, ExportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?;
        if headers.iter().ne(CSV_HEADERS.iter().copied()) {
            return Err(ExportError::Header(
                headers.iter().map(String::from).collect(),
            ));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(ExportRow {
                label: record.get(0).unwrap_or_default().to_string(),
                value: record.get(1).unwrap_or_default().to_string(),
            });
        }
        Ok(Self { rows })
    }

    /// Encode as a downloadable attachment.
    pub fn attachment(&self, settings: &ExportSettings) -> Result<Attachment, ExportError> {
        let csv = self.to_csv()?;
        tracing::debug!(
            filename = %settings.filename,
            rows = self.rows.len(),
            bytes = csv.len(),
            "Export encoded"
        );
        Ok(Attachment {
            filename: settings.filename.clone(),
            media_type: MEDIA_TYPE.to_string(),
            payload: STANDARD.encode(csv.as_bytes()),
        })
    }
}

/// A base64-encoded file offered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub media_type: String,
    /// Standard base64 of the file contents
    pub payload: String,
}

impl Attachment {
    /// `data:text/csv;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.payload)
    }

    /// An anchor element that downloads the attachment when clicked.
    pub fn html_link(&self, link_text: &str) -> String {
        format!(
            "<a href=\"{}\" download=\"{}\">{}</a>",
            self.data_uri(),
            escape_html(&self.filename),
            escape_html(link_text)
        )
    }

    /// The attachment's contents as text.
    pub fn decode(&self) -> Result<String, ExportError> {
        let bytes = STANDARD.decode(self.payload.as_bytes())?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_questionnaire() -> Questionnaire {
        Questionnaire::from_yaml(
            r#"
schema_version: "1.0"
name: "writing"
title: "Writing"
output: "export"
sections:
  - id: "source"
    title: "Source"
    fields:
      - id: "sources"
        label: "Which sources?"
        export_label: "Grant Source and Entity Type"
        domain: { type: "multi_choice", options: ["Federal", "State", "Foundation"] }
      - id: "summary"
        label: "Executive summary"
        domain: { type: "text", multiline: true }
      - id: "budget"
        label: "Budget"
        domain: { type: "decimal", min: 0 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rows_follow_registration_order() {
        let mut answers = AnswerRecord::new();
        answers.set("budget", 1500.0);
        answers.set("sources", vec!["Federal", "Foundation"]);

        let record = ExportRecord::from_answers(&test_questionnaire(), &answers);
        let labels: Vec<&str> = record.rows().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Grant Source and Entity Type", "Executive summary", "Budget"]
        );
        assert_eq!(record.rows()[0].value, "Federal, Foundation");
        assert_eq!(record.rows()[1].value, "");
        assert_eq!(record.rows()[2].value, "1500.0");
    }

    #[test]
    fn test_csv_quotes_commas_and_newlines() {
        let mut answers = AnswerRecord::new();
        answers.set("sources", vec!["Federal", "State"]);
        answers.set("summary", "Line one,\nline \"two\"");

        let record = ExportRecord::from_answers(&test_questionnaire(), &answers);
        let csv = record.to_csv().unwrap();
        assert!(csv.starts_with("Section,Input\n"));
        assert!(csv.contains("\"Federal, State\""));
        assert!(csv.contains("\"Line one,\nline \"\"two\"\"\""));

        let decoded = ExportRecord::from_csv(&csv).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_from_csv_rejects_other_headers() {
        let err = ExportRecord::from_csv("Label,Value\nA,B\n").unwrap_err();
        assert!(matches!(err, ExportError::Header(_)));
    }

    #[test]
    fn test_attachment_round_trip() {
        let mut answers = AnswerRecord::new();
        answers.set("summary", "We build things.");
        let record = ExportRecord::from_answers(&test_questionnaire(), &answers);

        let attachment = record.attachment(&ExportSettings::default()).unwrap();
        assert_eq!(attachment.filename, "grant_data.csv");
        assert_eq!(attachment.media_type, "text/csv");
        assert!(attachment.data_uri().starts_with("data:text/csv;base64,"));
        assert_eq!(attachment.decode().unwrap(), record.to_csv().unwrap());
    }

    #[test]
    fn test_html_link() {
        let attachment = Attachment {
            filename: "grant_data.csv".to_string(),
            media_type: MEDIA_TYPE.to_string(),
            payload: STANDARD.encode("Section,Input\n"),
        };
        assert_eq!(
            attachment.html_link("Download CSV File"),
            "<a href=\"data:text/csv;base64,U2VjdGlvbixJbnB1dAo=\" download=\"grant_data.csv\">Download CSV File</a>"
        );
    }

    #[test]
    fn test_empty_answers_export_every_field() {
        let record = ExportRecord::from_answers(&test_questionnaire(), &AnswerRecord::new());
        assert_eq!(record.len(), 3);
        assert!(record.rows().iter().all(|r| r.value.is_empty()));
    }
}
