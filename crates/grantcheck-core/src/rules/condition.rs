//! Predicates over an answer record.
//!
//! Conditions are evaluated in three-valued logic. A leaf that reads an
//! unanswered field is *unknown* (`None`); `all` is false as soon as one
//! part is false, `any` is true as soon as one part is true, and `not`
//! keeps unknown unknown. A rule fires only on a definite `Some(true)`,
//! so missing answers suppress messages instead of inventing them.

use serde::{Deserialize, Serialize};

use crate::answers::AnswerRecord;

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

/// A predicate over one or more answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Single choice equals a literal.
    Equals { field: String, value: String },

    /// Single choice differs from a literal.
    NotEquals { field: String, value: String },

    /// Single choice is one of several literals.
    OneOf { field: String, values: Vec<String> },

    NotOneOf { field: String, values: Vec<String> },

    /// Multi-choice answer is non-empty and does not contain `excluding`.
    Selected {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        excluding: Option<String>,
    },

    /// Numeric answer compared against a constant.
    Compare { field: String, op: CompareOp, value: f64 },

    /// Text answer contains any of the terms, ignoring case.
    Mentions { field: String, terms: Vec<String> },

    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate against a record. `None` means "cannot tell yet".
    pub fn evaluate(&self, answers: &AnswerRecord) -> Option<bool> {
        match self {
            Condition::Equals { field, value } => {
                let answer = answers.value(field)?;
                Some(answer.as_text() == Some(value.as_str()))
            }
            Condition::NotEquals { field, value } => {
                let answer = answers.value(field)?;
                Some(answer.as_text() != Some(value.as_str()))
            }
            Condition::OneOf { field, values } => {
                let answer = answers.value(field)?;
                Some(
                    answer
                        .as_text()
                        .is_some_and(|text| values.iter().any(|v| v == text)),
                )
            }
            Condition::NotOneOf { field, values } => {
                let answer = answers.value(field)?;
                Some(
                    !answer
                        .as_text()
                        .is_some_and(|text| values.iter().any(|v| v == text)),
                )
            }
            Condition::Selected { field, excluding } => {
                let answer = answers.value(field)?;
                let items = answer.as_selections().unwrap_or(&[]);
                let excluded = excluding
                    .as_ref()
                    .is_some_and(|sentinel| items.iter().any(|i| i == sentinel));
                Some(!items.is_empty() && !excluded)
            }
            Condition::Compare { field, op, value } => {
                let answer = answers.value(field)?;
                Some(answer.as_number().is_some_and(|n| op.apply(n, *value)))
            }
            Condition::Mentions { field, terms } => {
                let answer = answers.value(field)?;
                let text = answer.as_text().unwrap_or("").to_lowercase();
                Some(terms.iter().any(|t| text.contains(&t.to_lowercase())))
            }
            Condition::All(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(answers) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Condition::Any(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(answers) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Condition::Not(inner) => inner.evaluate(answers).map(|b| !b),
        }
    }

    /// True only when the condition definitely holds.
    pub fn holds(&self, answers: &AnswerRecord) -> bool {
        self.evaluate(answers) == Some(true)
    }

    /// Field identifiers this condition reads, in first-seen order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Equals { field, .. }
            | Condition::NotEquals { field, .. }
            | Condition::OneOf { field, .. }
            | Condition::NotOneOf { field, .. }
            | Condition::Selected { field, .. }
            | Condition::Compare { field, .. }
            | Condition::Mentions { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field.as_str());
                }
            }
            Condition::All(parts) | Condition::Any(parts) => {
                for part in parts {
                    part.collect_fields(out);
                }
            }
            Condition::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Choice literals compared against each field, for checking them
    /// against the field's options.
    pub fn choice_literals(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Condition::Equals { field, value } | Condition::NotEquals { field, value } => {
                out.push((field.as_str(), value.as_str()));
            }
            Condition::OneOf { field, values } | Condition::NotOneOf { field, values } => {
                out.extend(values.iter().map(|v| (field.as_str(), v.as_str())));
            }
            Condition::Selected {
                field,
                excluding: Some(sentinel),
            } => out.push((field.as_str(), sentinel.as_str())),
            Condition::All(parts) | Condition::Any(parts) => {
                for part in parts {
                    part.collect_literals(out);
                }
            }
            Condition::Not(inner) => inner.collect_literals(out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equals(field: &str, value: &str) -> Condition {
        Condition::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    fn compare(field: &str, op: CompareOp, value: f64) -> Condition {
        Condition::Compare {
            field: field.to_string(),
            op,
            value,
        }
    }

    #[test]
    fn test_unanswered_leaf_is_unknown() {
        let answers = AnswerRecord::new();
        assert_eq!(equals("need", "Yes").evaluate(&answers), None);
        assert_eq!(
            Condition::NotEquals {
                field: "industry".to_string(),
                value: "Other".to_string()
            }
            .evaluate(&answers),
            None
        );
        assert!(!compare("employees", CompareOp::Lt, 500.0).holds(&answers));
    }

    #[test]
    fn test_threshold_boundary() {
        let below = compare("employees", CompareOp::Lt, 500.0);
        let mut answers = AnswerRecord::new();
        answers.set("employees", 500_i64);
        assert!(!below.holds(&answers));
        answers.set("employees", 499_i64);
        assert!(below.holds(&answers));
    }

    #[test]
    fn test_selected_with_sentinel() {
        let cond = Condition::Selected {
            field: "ownership".to_string(),
            excluding: Some("None".to_string()),
        };
        let mut answers = AnswerRecord::new();
        answers.set("ownership", vec!["None"]);
        assert_eq!(cond.evaluate(&answers), Some(false));
        answers.set("ownership", vec!["Women-Owned"]);
        assert_eq!(cond.evaluate(&answers), Some(true));
        answers.set("ownership", Vec::<String>::new());
        assert_eq!(cond.evaluate(&answers), Some(false));
    }

    #[test]
    fn test_kleene_compounds() {
        let either = Condition::Any(vec![equals("capital_access", "Yes"), equals("hardship", "Yes")]);
        let both = Condition::All(vec![equals("good_standing", "Yes"), equals("compliance", "Yes")]);

        let mut answers = AnswerRecord::new();
        answers.set("hardship", "Yes");
        assert_eq!(either.evaluate(&answers), Some(true));

        answers.set("hardship", "No");
        assert_eq!(either.evaluate(&answers), None);

        answers.set("good_standing", "No");
        assert_eq!(both.evaluate(&answers), Some(false));
        answers.set("good_standing", "Yes");
        assert_eq!(both.evaluate(&answers), None);

        assert_eq!(Condition::Not(Box::new(equals("x", "y"))).evaluate(&answers), None);
    }

    #[test]
    fn test_mentions_ignores_case() {
        let metro = Condition::Mentions {
            field: "county".to_string(),
            terms: vec!["Hennepin".to_string(), "Ramsey".to_string()],
        };
        let mut answers = AnswerRecord::new();
        answers.set("county", "hennepin county");
        assert!(metro.holds(&answers));
        answers.set("county", "Olmsted");
        assert_eq!(metro.evaluate(&answers), Some(false));
    }

    #[test]
    fn test_fields_and_literals() {
        let cond = Condition::All(vec![
            equals("located", "Yes"),
            Condition::Not(Box::new(Condition::OneOf {
                field: "industry".to_string(),
                values: vec!["Retail".to_string(), "Other".to_string()],
            })),
            equals("located", "Yes"),
        ]);
        assert_eq!(cond.fields(), vec!["located", "industry"]);
        assert_eq!(
            cond.choice_literals(),
            vec![
                ("located", "Yes"),
                ("industry", "Retail"),
                ("industry", "Other"),
                ("located", "Yes")
            ]
        );
    }

    #[test]
    fn test_deserialize_nested() {
        let cond: Condition = serde_json::from_value(serde_json::json!({
            "all": [
                { "equals": { "field": "located_in_mn", "value": "Yes" } },
                { "not": { "compare": { "field": "years", "op": "ge", "value": 2 } } }
            ]
        }))
        .unwrap();
        let mut answers = AnswerRecord::new();
        answers.set("located_in_mn", "Yes");
        answers.set("years", 1.5);
        assert!(cond.holds(&answers));
    }
}
