//! Configuration for stepguard.
//!
//! Both components work without any configuration. A TOML file can add extra
//! classifier triggers and extra sensitive key fragments; it can never remove
//! built-in ones or reorder category precedence.
//!
//! ```toml
//! [classifier.extra_triggers]
//! timeout = ["deadline exceeded"]
//! transient_network = ["connection aborted"]
//!
//! [redaction]
//! extra_sensitive_keys = ["ssn", "iban"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorClassifier};
use crate::redact::Redactor;

/// Extra classification triggers, keyed by category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierSettings {
    /// Substrings appended to a category's built-in triggers
    #[serde(default)]
    pub extra_triggers: HashMap<ErrorCategory, Vec<String>>,
}

/// Extra redaction key fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedactionSettings {
    /// Fragments masked in addition to the built-in ones
    #[serde(default)]
    pub extra_sensitive_keys: Vec<String>,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file path is invalid.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ::config::ConfigError),

    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Triggers were configured for a category that only means "no match".
    #[error("category '{0}' cannot have triggers")]
    UnclassifiableCategory(ErrorCategory),

    /// A trigger was empty after trimming.
    #[error("empty trigger configured for category '{0}'")]
    EmptyTrigger(ErrorCategory),

    /// The triggers could not be compiled.
    #[error("invalid classifier triggers: {0}")]
    Pattern(#[from] regex::Error),
}

/// `STEPGUARD__` overrides. Every list setting is comma-separated, including
/// one trigger list per matchable category.
fn environment() -> Environment {
    ErrorCategory::ALL
        .iter()
        .filter(|category| **category != ErrorCategory::Unknown)
        .fold(
            Environment::with_prefix("STEPGUARD")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("redaction.extra_sensitive_keys"),
            |env, category| {
                env.with_list_parse_key(&format!("classifier.extra_triggers.{}", category.as_str()))
            },
        )
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepguardConfig {
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub redaction: RedactionSettings,
}

impl StepguardConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Environment Variable Overrides
    ///
    /// Values can be overridden with `STEPGUARD__<SECTION>__<KEY>`, e.g.
    /// `STEPGUARD__REDACTION__EXTRA_SENSITIVE_KEYS=ssn,iban`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file does not exist
    /// - The configuration file cannot be parsed
    /// - The configured triggers are invalid
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        Self::load_with_env(path, path_str, environment())
    }

    fn load_with_env(
        path: &Path,
        path_str: &str,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(env)
            .build()?;

        let loaded: StepguardConfig = config.try_deserialize()?;
        loaded.validate()?;

        tracing::debug!(path = %path_str, "loaded configuration");
        Ok(loaded)
    }

    /// Parse configuration from TOML text. No environment overrides apply.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let parsed: StepguardConfig = toml::from_str(text)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the settings for values the components cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (category, triggers) in &self.classifier.extra_triggers {
            if *category == ErrorCategory::Unknown {
                return Err(ConfigError::UnclassifiableCategory(*category));
            }
            if triggers.iter().any(|t| t.trim().is_empty()) {
                return Err(ConfigError::EmptyTrigger(*category));
            }
        }
        Ok(())
    }

    /// Build a classifier with the configured triggers.
    pub fn classifier(&self) -> Result<ErrorClassifier, ConfigError> {
        self.validate()?;
        Ok(ErrorClassifier::with_settings(&self.classifier)?)
    }

    /// Build a redactor with the configured key fragments.
    pub fn redactor(&self) -> Redactor {
        Redactor::with_settings(&self.redaction)
    }
}
