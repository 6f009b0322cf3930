//! Message templates.
//!
//! A rule message may interpolate answers with `{field}` placeholders.
//! An optional format specifier follows a colon:
//!
//! | Placeholder     | Answer        | Output          |
//! |-----------------|---------------|-----------------|
//! | `{employees}`   | `10`          | `10`            |
//! | `{wage}`        | `20.0`        | `20.0`          |
//! | `{years:.1}`    | `20.0`        | `20.0`          |
//! | `{revenue:,.2}` | `250000.0`    | `250,000.00`    |
//! | `{uses}`        | `[Capital, R&D]` | `Capital, R&D` |
//!
//! Unanswered fields render as an empty string.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::answers::{AnswerRecord, AnswerValue};

lazy_static! {
    /// `{name}`, `{name:.N}`, `{name:,}` or `{name:,.N}`
    static ref PLACEHOLDER: Regex = Regex::new(
        r"\{([A-Za-z_][A-Za-z0-9_]*)(?::(,)?(?:\.([0-9]+))?)?\}"
    ).unwrap();
}

/// Field identifiers a template reads, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Render a template against an answer record.
pub fn render(template: &str, answers: &AnswerRecord) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let field = &caps[1];
            let grouped = caps.get(2).is_some();
            let precision = caps.get(3).and_then(|m| m.as_str().parse::<usize>().ok());
            answers
                .value(field)
                .map(|value| format_value(value, grouped, precision))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Format one answer with an optional thousands separator and precision.
pub fn format_value(value: &AnswerValue, grouped: bool, precision: Option<usize>) -> String {
    let number = match value.as_number() {
        Some(n) => n,
        None => return value.to_string(),
    };

    let plain = match (value, precision) {
        (_, Some(p)) => format!("{:.*}", p, number),
        (AnswerValue::Integer(n), None) => n.to_string(),
        _ => value.to_string(),
    };

    if grouped {
        group_thousands(&plain)
    } else {
        plain
    }
}

/// Insert `,` every three digits of the integer part.
fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return number.to_string();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}{}", sign, grouped, frac_part)
}
