//! The answer record: everything a respondent has entered so far.
//!
//! A record maps field identifiers to [`AnswerValue`]s. Writes overwrite,
//! reads never fail, and a field that was never written is simply
//! "not yet answered". There is no validation here; input domains are
//! enforced one layer up, in [`crate::questionnaire::Domain`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A stored answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// A single selected choice, or free text.
    Choice(String),

    /// Several selected choices. Kept in selection order for display,
    /// compared as a set.
    Selections(Vec<String>),

    /// A whole number (head counts, jobs).
    Integer(i64),

    /// A decimal amount, including values derived from other answers.
    Decimal(f64),

    /// A calendar date.
    Date(NaiveDate),
}

impl AnswerValue {
    /// Build a selection value, dropping repeated choices.
    pub fn selections<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for item in items {
            let item = item.into();
            if seen.insert(item.clone()) {
                out.push(item);
            }
        }
        AnswerValue::Selections(out)
    }

    /// Text of a single choice.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Selected items of a multi-choice answer.
    pub fn as_selections(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Selections(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view of integer and decimal answers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Integer(n) => Some(*n as f64),
            AnswerValue::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AnswerValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerValue::Choice(_) => "choice",
            AnswerValue::Selections(_) => "selections",
            AnswerValue::Integer(_) => "integer",
            AnswerValue::Decimal(_) => "decimal",
            AnswerValue::Date(_) => "date",
        }
    }
}

impl PartialEq for AnswerValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AnswerValue::Choice(a), AnswerValue::Choice(b)) => a == b,
            (AnswerValue::Selections(a), AnswerValue::Selections(b)) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            (AnswerValue::Integer(a), AnswerValue::Integer(b)) => a == b,
            (AnswerValue::Decimal(a), AnswerValue::Decimal(b)) => a == b,
            (AnswerValue::Date(a), AnswerValue::Date(b)) => a == b,
            _ => false,
        }
    }
}

/// Plain string form: what a results line or an export cell shows when no
/// format is requested.
impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Choice(s) => f.write_str(s),
            AnswerValue::Selections(items) => f.write_str(&items.join(", ")),
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Decimal(n) => f.write_str(&plain_decimal(*n)),
            AnswerValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Choice(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Choice(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::selections(value)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(value: Vec<&str>) -> Self {
        AnswerValue::selections(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Integer(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Decimal(value)
    }
}

impl From<NaiveDate> for AnswerValue {
    fn from(value: NaiveDate) -> Self {
        AnswerValue::Date(value)
    }
}

/// Shortest round-trip decimal that always shows a fractional part
/// (`20.0`, not `20`).
pub fn plain_decimal(value: f64) -> String {
    let s = value.to_string();
    if value.is_finite() && !s.contains('.') && !s.contains('e') {
        format!("{}.0", s)
    } else {
        s
    }
}

/// Raw input as it arrives from a form widget or an answers file, before
/// the field's domain has checked and typed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Integer(i64),
    Decimal(f64),
    Text(String),
    Many(Vec<String>),
}

impl AnswerInput {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerInput::Text(value.into())
    }

    pub fn many<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerInput::Many(items.into_iter().map(Into::into).collect())
    }

    /// True for an empty text entry (an untouched widget).
    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerInput::Text(s) if s.trim().is_empty())
    }
}

/// All answers collected in one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerRecord {
    values: BTreeMap<String, AnswerValue>,
}

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an answer, replacing any earlier answer for the same field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<AnswerValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// Forget an answer. Returns the value that was stored.
    pub fn remove(&mut self, field: &str) -> Option<AnswerValue> {
        self.values.remove(field)
    }

    /// The stored answer, or `default` if the field was never answered.
    pub fn get<'a>(&'a self, field: &str, default: &'a AnswerValue) -> &'a AnswerValue {
        self.values.get(field).unwrap_or(default)
    }

    /// The stored answer, if any.
    pub fn value(&self, field: &str) -> Option<&AnswerValue> {
        self.values.get(field)
    }

    pub fn is_answered(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Text of a choice answer; empty when unanswered or not a choice.
    pub fn text(&self, field: &str) -> &str {
        self.value(field).and_then(AnswerValue::as_text).unwrap_or("")
    }

    /// Items of a multi-choice answer; empty when unanswered.
    pub fn selections(&self, field: &str) -> &[String] {
        self.value(field)
            .and_then(AnswerValue::as_selections)
            .unwrap_or(&[])
    }

    /// Numeric answer; zero when unanswered or not numeric.
    pub fn number(&self, field: &str) -> f64 {
        self.value(field)
            .and_then(AnswerValue::as_number)
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Answers ordered by field identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_default_for_unanswered() {
        let record = AnswerRecord::new();
        let default = AnswerValue::Integer(0);
        assert_eq!(record.get("employees", &default), &AnswerValue::Integer(0));
        assert_eq!(record.text("industry"), "");
        assert!(record.selections("ownership").is_empty());
        assert_eq!(record.number("wage"), 0.0);
    }

    #[test]
    fn test_set_overwrites() {
        let mut record = AnswerRecord::new();
        record.set("industry", "Energy");
        record.set("industry", "Agriculture");
        assert_eq!(record.text("industry"), "Agriculture");
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_selections_compare_as_set() {
        let a = AnswerValue::from(vec!["Women-Owned", "Veteran-Owned"]);
        let b = AnswerValue::from(vec!["Veteran-Owned", "Women-Owned", "Women-Owned"]);
        assert_eq!(a, b);
        assert_eq!(b.as_selections().unwrap().len(), 2);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(AnswerValue::Decimal(20.0).to_string(), "20.0");
        assert_eq!(AnswerValue::Decimal(17.5).to_string(), "17.5");
        assert_eq!(AnswerValue::Integer(10).to_string(), "10");
        assert_eq!(
            AnswerValue::from(vec!["Capital", "R&D"]).to_string(),
            "Capital, R&D"
        );
        let date = NaiveDate::from_ymd_opt(2005, 4, 15).unwrap();
        assert_eq!(AnswerValue::Date(date).to_string(), "2005-04-15");
    }

    #[test]
    fn test_number_reads_integers_and_decimals() {
        let mut record = AnswerRecord::new();
        record.set("employees", 12_i64);
        record.set("wage", 21.5);
        record.set("industry", "Energy");
        assert_eq!(record.number("employees"), 12.0);
        assert_eq!(record.number("wage"), 21.5);
        assert_eq!(record.number("industry"), 0.0);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let mut record = AnswerRecord::new();
        record.set("industry", "Energy");
        record.set("uses", vec!["Capital", "Training"]);
        record.set("years", 3.5);
        record.set("start_date", NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());

        let json = serde_json::to_string(&record).unwrap();
        let back: AnswerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_answer_input_untagged() {
        let parsed: BTreeMap<String, AnswerInput> =
            serde_yaml::from_str("employees: 10\nwage: 20.5\nindustry: Energy\nuses: [Capital]\n")
                .unwrap();
        assert_eq!(parsed["employees"], AnswerInput::Integer(10));
        assert_eq!(parsed["wage"], AnswerInput::Decimal(20.5));
        assert_eq!(parsed["industry"], AnswerInput::text("Energy"));
        assert_eq!(parsed["uses"], AnswerInput::many(["Capital"]));
        assert!(AnswerInput::text("  ").is_blank());
    }
}
