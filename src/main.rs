use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use stepguard::config::{ConfigError, StepguardConfig};
use stepguard::error::{ErrorClassifier, ErrorInput};
use stepguard::logging::{init_logging, LoggingConfig};
use stepguard::redact::Redactor;
use stepguard::report::FailureReport;

/// Exit code for unreadable input, bad JSON, or bad configuration.
const EXIT_INPUT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stepguard")]
#[command(version)]
#[command(about = "Classify workflow step failures and redact step payloads")]
struct Cli {
    /// Configuration file (TOML) with extra triggers and sensitive keys
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress all log output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(long, short, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Print single-line JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a failure and print category, retriability and message
    Classify {
        /// Failure message (treated as a structured error)
        #[arg(long, short, conflicts_with = "input")]
        message: Option<String>,

        /// Stack trace to attach to --message
        #[arg(long, requires = "message")]
        stack: Option<String>,

        /// JSON file holding the failure value ("-" for stdin, the default)
        #[arg(long, short, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Print a redacted copy of a JSON payload
    Redact {
        /// JSON file to redact ("-" for stdin, the default)
        #[arg(long, short, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Print a dead-letter record for a failure and its payload
    Report {
        /// Failure message
        #[arg(long, short)]
        message: String,

        /// Stack trace of the failure
        #[arg(long)]
        stack: Option<String>,

        /// JSON file with the step payload ("-" for stdin)
        #[arg(long, short, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Identifier of the failed step
        #[arg(long, requires = "step_type")]
        step_id: Option<String>,

        /// Type of the failed step
        #[arg(long, requires = "step_id")]
        step_type: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet));

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(ExitCode::from(EXIT_INPUT_ERROR))
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let config = match &cli.config {
        Some(path) => StepguardConfig::load(path)?,
        None => StepguardConfig::default(),
    };

    let output = match &cli.command {
        Commands::Classify {
            message,
            stack,
            input,
        } => {
            let classifier = config.classifier()?;
            let error = match message {
                Some(message) => {
                    let error = ErrorInput::error(message.as_str());
                    match stack {
                        Some(stack) => error.with_stack(stack.as_str()),
                        None => error,
                    }
                }
                None => ErrorInput::from(read_json(input.as_deref())?),
            };
            render(&classifier.classify(error), cli.compact)
        }
        Commands::Redact { input } => {
            let payload = read_json(input.as_deref())?;
            render(&config.redactor().redact_value(&payload), cli.compact)
        }
        Commands::Report {
            message,
            stack,
            input,
            step_id,
            step_type,
        } => {
            let classifier: ErrorClassifier = config.classifier()?;
            let redactor: Redactor = config.redactor();
            let payload = match input {
                Some(path) => read_json(Some(path.as_path()))?,
                None => Value::Null,
            };

            let mut error = ErrorInput::error(message.as_str());
            if let Some(stack) = stack {
                error = error.with_stack(stack.as_str());
            }

            let mut report = FailureReport::capture(&classifier, &redactor, error, &payload);
            if let (Some(id), Some(kind)) = (step_id, step_type) {
                report = report.with_step(id.as_str(), kind.as_str());
            }
            render(&report, cli.compact)
        }
    };

    Ok(output)
}

/// Reads JSON from a file, or from stdin when the path is absent or "-".
fn read_json(path: Option<&Path>) -> Result<Value, CliError> {
    let (label, text) = match path {
        Some(path) if path != Path::new("-") => {
            let label = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: label.clone(),
                source,
            })?;
            (label, text)
        }
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| CliError::Read {
                    path: "stdin".to_string(),
                    source,
                })?;
            ("stdin".to_string(), text)
        }
    };

    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: label,
        source,
    })
}

fn render<T: Serialize>(value: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    // Serializing plain data structures with string keys cannot fail.
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}
