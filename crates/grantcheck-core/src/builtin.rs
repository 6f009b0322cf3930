//! Questionnaires shipped with the crate.

use std::path::Path;

use crate::questionnaire::{Questionnaire, QuestionnaireError};

const FEDERAL_YAML: &str = include_str!("../../../questionnaires/federal.yaml");
const MINNESOTA_YAML: &str = include_str!("../../../questionnaires/minnesota.yaml");
const GRANT_WRITING_YAML: &str = include_str!("../../../questionnaires/grant-writing.yaml");

const BUILTIN: [(&str, &str); 3] = [
    ("federal", FEDERAL_YAML),
    ("minnesota", MINNESOTA_YAML),
    ("grant-writing", GRANT_WRITING_YAML),
];

/// Names of the built-in questionnaires.
pub fn names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(name, _)| *name).collect()
}

/// Load a built-in questionnaire by name.
pub fn load(name: &str) -> Result<Questionnaire, QuestionnaireError> {
    let (_, yaml) = BUILTIN
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .ok_or_else(|| QuestionnaireError::UnknownQuestionnaire(name.to_string()))?;
    Questionnaire::from_yaml(yaml)
}

/// Load a built-in questionnaire by name, or a questionnaire file by path.
pub fn resolve(name_or_path: &str) -> Result<Questionnaire, QuestionnaireError> {
    if BUILTIN.iter().any(|(name, _)| *name == name_or_path) {
        return load(name_or_path);
    }

    let path = Path::new(name_or_path);
    if path.exists() {
        return Questionnaire::from_file(path);
    }

    Err(QuestionnaireError::UnknownQuestionnaire(name_or_path.to_string()))
}
