//! Binary entry point for grantcheck.
//!
//! Runs grant-eligibility questionnaires from the command line.

mod interview;
mod report;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use grantcheck_core::{
    builtin, AnswerInput, EvaluationConfig, OutputMode, Questionnaire, Session,
};

use report::{ExportFormat, ReportFormat};
use settings::Settings;

/// grantcheck - Grant eligibility questionnaires and feedback.
#[derive(Parser)]
#[command(name = "grantcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a settings file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List the built-in questionnaires.
    List,

    /// Show a questionnaire's sections, fields and rules.
    Show {
        /// Built-in name or path to a questionnaire file.
        questionnaire: String,
    },

    /// Check a questionnaire file.
    Validate {
        /// Path to a questionnaire file (YAML or JSON).
        file: PathBuf,
    },

    /// Evaluate an answers file.
    Evaluate {
        /// Built-in name or path to a questionnaire file.
        #[arg(short, long)]
        questionnaire: Option<String>,

        /// Answers file (YAML or JSON map of field id to value).
        #[arg(short, long)]
        answers: PathBuf,

        /// Evaluation date, YYYY-MM-DD (default: today).
        #[arg(long)]
        as_of: Option<String>,

        /// Output format.
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,
    },

    /// Answer a questionnaire interactively.
    Interview {
        /// Built-in name or path to a questionnaire file.
        #[arg(short, long)]
        questionnaire: Option<String>,

        /// Evaluation date, YYYY-MM-DD (default: today).
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Export an answers file as CSV.
    Export {
        /// Built-in name or path to a questionnaire file.
        #[arg(short, long)]
        questionnaire: Option<String>,

        /// Answers file (YAML or JSON map of field id to value).
        #[arg(short, long)]
        answers: PathBuf,

        /// Evaluation date, YYYY-MM-DD (default: today).
        #[arg(long)]
        as_of: Option<String>,

        /// Encoding of the export.
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Show { questionnaire } => cmd_show(&questionnaire),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Evaluate {
            questionnaire,
            answers,
            as_of,
            format,
        } => {
            let session = load_session(&settings, questionnaire.as_deref(), as_of.as_deref(), &answers)?;
            let assessment = session.results();
            let rendered =
                report::render_assessment(&assessment, session.questionnaire(), settings.format(format))?;
            print!("{}", rendered);
            Ok(())
        }
        Commands::Interview { questionnaire, as_of } => {
            let questionnaire = load_questionnaire(settings.questionnaire(questionnaire.as_deref())?)?;
            let config = evaluation_config(&settings, as_of.as_deref())?;
            let mut session = Session::new(questionnaire, config);

            let stdin = io::stdin();
            let stdout = io::stdout();
            interview::run(&mut session, &mut stdin.lock(), &mut stdout.lock())?;

            let rendered = match session.questionnaire().output {
                OutputMode::Feedback => report::render_assessment(
                    &session.results(),
                    session.questionnaire(),
                    settings.format(None),
                )?,
                OutputMode::Export => report::render_export(
                    &session.export(),
                    &session.questionnaire().export,
                    ExportFormat::Csv,
                )?,
            };
            println!();
            print!("{}", rendered);
            Ok(())
        }
        Commands::Export {
            questionnaire,
            answers,
            as_of,
            format,
            output,
        } => {
            let session = load_session(&settings, questionnaire.as_deref(), as_of.as_deref(), &answers)?;
            let rendered =
                report::render_export(&session.export(), &session.questionnaire().export, format)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Export written");
                }
                None => {
                    io::stdout().write_all(rendered.as_bytes())?;
                }
            }
            Ok(())
        }
    }
}

fn cmd_list() -> Result<()> {
    for name in builtin::names() {
        let questionnaire = builtin::load(name)?;
        let output = match questionnaire.output {
            OutputMode::Feedback => "feedback",
            OutputMode::Export => "export",
        };
        println!("{:<15} {:<9} {}", name, output, questionnaire.title);
    }
    Ok(())
}

fn cmd_show(name_or_path: &str) -> Result<()> {
    let questionnaire = load_questionnaire(name_or_path)?;
    print!("{}", report::describe_questionnaire(&questionnaire));
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let questionnaire = Questionnaire::from_file(path)
        .with_context(|| format!("Invalid questionnaire {}", path.display()))?;
    println!(
        "OK: {} ({} sections, {} fields, {} rules)",
        questionnaire.name,
        questionnaire.sections.len(),
        questionnaire.fields().count(),
        questionnaire.rules.len()
    );
    Ok(())
}

fn load_questionnaire(name_or_path: &str) -> Result<Questionnaire> {
    builtin::resolve(name_or_path)
        .with_context(|| format!("Failed to load questionnaire {}", name_or_path))
}

fn evaluation_config(settings: &Settings, as_of: Option<&str>) -> Result<EvaluationConfig> {
    Ok(match settings.evaluation_date(as_of)? {
        Some(date) => EvaluationConfig::new(date),
        None => EvaluationConfig::default(),
    })
}

/// Read an answers file and run every answer through a session, so each
/// one is checked against its field.
fn load_session(
    settings: &Settings,
    questionnaire: Option<&str>,
    as_of: Option<&str>,
    answers: &Path,
) -> Result<Session> {
    let questionnaire = settings.questionnaire(questionnaire)?;
    let config = evaluation_config(settings, as_of)?;

    let inputs = read_answers(answers)?;
    Session::open(questionnaire, config, inputs).with_context(|| {
        format!(
            "Failed to load {} into questionnaire {}",
            answers.display(),
            questionnaire
        )
    })
}

fn read_answers(path: &Path) -> Result<BTreeMap<String, AnswerInput>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let inputs = if is_json {
        serde_json::from_str(&contents)?
    } else {
        serde_yaml::from_str(&contents)?
    };
    Ok(inputs)
}
