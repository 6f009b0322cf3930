//! Interactive prompting, section by section.

use anyhow::Result;
use std::io::{BufRead, Write};

use grantcheck_core::{AnswerInput, Domain, Field, Session, Step};

/// Ask every visible question of every section, in order.
///
/// An empty reply keeps the field's default (the first option, the minimum,
/// the evaluation date). Choices may be given by number or by name. Stops
/// early, keeping the answers so far, when the input ends.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: &mut R, output: &mut W) -> Result<()> {
    let section_count = session.sections().len();

    for index in 0..section_count {
        session.jump_to(Step::Section(index));
        let section = session.sections()[index].clone();

        writeln!(output)?;
        writeln!(output, "== {} ==", section.title)?;
        if let Some(description) = &section.description {
            writeln!(output, "{}", description)?;
        }

        // Visibility is rechecked per field: an earlier reply in the same
        // section can reveal a later sub-question.
        for field in &section.fields {
            if !session.is_visible(field) {
                continue;
            }
            if !ask(session, field, input, output)? {
                tracing::info!(field = %field.id, "Input ended; interview stopped");
                session.jump_to(Step::Results);
                return Ok(());
            }
        }
    }

    session.jump_to(Step::Results);
    Ok(())
}

/// Prompt until the field takes an answer. Returns false at end of input.
fn ask<R: BufRead, W: Write>(
    session: &mut Session,
    field: &Field,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    loop {
        writeln!(output)?;
        writeln!(output, "{}", field.label)?;
        for (number, option) in field.domain.options().iter().enumerate() {
            writeln!(output, "  {}) {}", number + 1, option)?;
        }
        write!(output, "[{}] > ", hint(&field.domain))?;
        output.flush()?;

        let reply = match read_reply(&field.domain, input)? {
            Some(reply) => reply,
            None => return Ok(false),
        };

        let answer = if reply.trim().is_empty() {
            field.default_input(session.config().evaluation_date)
        } else {
            parse_reply(&field.domain, &reply)
        };

        match session.answer(&field.id, answer) {
            Ok(()) => return Ok(true),
            Err(e) => writeln!(output, "  ! {}", e)?,
        }
    }
}

fn hint(domain: &Domain) -> String {
    match domain {
        Domain::SingleChoice { .. } => "number or name".to_string(),
        Domain::MultiChoice { .. } => "numbers or names separated by commas".to_string(),
        Domain::Text { multiline: true } => "text, end with an empty line".to_string(),
        other => other.describe(),
    }
}

/// Read one reply; multi-line text runs until an empty line.
fn read_reply<R: BufRead>(domain: &Domain, input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let first = line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string();

    if !matches!(domain, Domain::Text { multiline: true }) || first.is_empty() {
        return Ok(Some(first));
    }

    let mut lines = vec![first];
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let next = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if next.is_empty() {
            break;
        }
        lines.push(next.to_string());
    }
    Ok(Some(lines.join("\n")))
}

/// Turn a typed reply into raw input for the field's domain.
fn parse_reply(domain: &Domain, reply: &str) -> AnswerInput {
    let reply = reply.trim();
    match domain {
        Domain::SingleChoice { options } => {
            AnswerInput::text(choice_by_number(options, reply).unwrap_or(reply))
        }
        Domain::MultiChoice { options } => AnswerInput::many(split_choices(options, reply)),
        _ => AnswerInput::text(reply),
    }
}

/// Split a comma-separated reply into choices. Option names that contain
/// commas themselves are kept whole.
fn split_choices<'a>(options: &'a [String], reply: &'a str) -> Vec<&'a str> {
    let pieces: Vec<&str> = reply.split(',').collect();
    let mut items = Vec::new();
    let mut start = 0;

    while start < pieces.len() {
        // Longest run of pieces that spells out an option name
        let whole = (start..pieces.len()).rev().find_map(|end| {
            let joined = pieces[start..=end].join(",");
            options
                .iter()
                .find(|option| option.as_str() == joined.trim())
                .map(|option| (end, option.as_str()))
        });

        match whole {
            Some((end, option)) => {
                items.push(option);
                start = end + 1;
            }
            None => {
                let item = pieces[start].trim();
                if !item.is_empty() {
                    items.push(choice_by_number(options, item).unwrap_or(item));
                }
                start += 1;
            }
        }
    }
    items
}

fn choice_by_number<'a>(options: &'a [String], reply: &str) -> Option<&'a str> {
    let number: usize = reply.parse().ok()?;
    options
        .get(number.checked_sub(1)?)
        .map(String::as_str)
}
