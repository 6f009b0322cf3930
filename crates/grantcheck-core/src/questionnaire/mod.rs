//! Questionnaire documents: sections, input domains and the rule catalog.
//!
//! Questionnaires are YAML/JSON documents validated against
//! `schemas/questionnaire.schema.json` and then checked for internal
//! consistency (unique ids, rules that only read known fields).

mod field;
mod parser;
mod schema;

pub use field::{Domain, Field, InputError, Section};
pub use parser::{ExportSettings, OutputMode, Questionnaire, QuestionnaireError, ResultsText};
pub use schema::SchemaError;
