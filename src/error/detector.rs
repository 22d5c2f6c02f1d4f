//! Ordered trigger matching for step failures
//!
//! Every category owns a list of literal trigger substrings. The lower-cased
//! failure message is checked against each category in precedence order and
//! the first category with any matching trigger wins. Messages such as
//! "429 invalid payload" are intentionally ambiguous; the order of the table
//! decides them.

use std::sync::OnceLock;

use regex::Regex;

use super::{ErrorCategory, ErrorClassification, ErrorInput};
use crate::config::ClassifierSettings;

/// Built-in triggers, in precedence order.
const DEFAULT_TRIGGERS: [(ErrorCategory, &[&str]); 7] = [
    (ErrorCategory::Timeout, &["timeout", "timed out", "etimedout"]),
    (
        ErrorCategory::TransientNetwork,
        &[
            "econnreset",
            "econnrefused",
            "enotfound",
            "ehostunreach",
            "network",
            "socket hang up",
        ],
    ),
    (
        ErrorCategory::RateLimit,
        &["429", "rate limit", "too many requests"],
    ),
    (
        ErrorCategory::Provider5xx,
        &[
            "500",
            "502",
            "503",
            "504",
            "bad gateway",
            "service unavailable",
            "internal server error",
        ],
    ),
    (
        ErrorCategory::Provider4xx,
        &["401", "403", "404", "forbidden", "unauthorized", "not found"],
    ),
    (
        ErrorCategory::MissingConfig,
        &[
            "missing config",
            "not configured",
            "requires a valid",
            "unknown step type",
        ],
    ),
    (
        ErrorCategory::Validation,
        &[
            "validation",
            "invalid",
            "unprocessable",
            "schema",
            "bad request",
            "422",
        ],
    ),
];

/// A single classification rule: a category and its literal triggers.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    category: ErrorCategory,
    triggers: Vec<String>,
    /// Alternation of the escaped triggers; matches lower-cased text.
    /// `None` when there are no triggers.
    regex: Option<Regex>,
}

impl ErrorPattern {
    /// Creates a rule from literal triggers. Triggers are lower-cased and
    /// blank ones are dropped.
    ///
    /// # Errors
    /// Returns an error if the compiled alternation exceeds the regex size
    /// limit.
    pub fn new<I, S>(category: ErrorCategory, triggers: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let triggers: Vec<String> = triggers
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        // An empty alternation would match everything.
        let regex = if triggers.is_empty() {
            None
        } else {
            let source = triggers
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&source)?)
        };

        Ok(Self {
            category,
            triggers,
            regex,
        })
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// The lower-cased literal triggers.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Checks an already lower-cased message.
    pub fn matches(&self, lowered: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(lowered))
    }

    /// Returns the first trigger occurrence in an already lower-cased message.
    pub fn find<'a>(&self, lowered: &'a str) -> Option<&'a str> {
        self.regex
            .as_ref()
            .and_then(|regex| regex.find(lowered))
            .map(|m| m.as_str())
    }
}

/// Classifies step failures by ordered trigger matching.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    /// One rule per matchable category, in precedence order.
    patterns: Vec<ErrorPattern>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier {
    /// Creates a classifier with the built-in trigger table.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(),
        }
    }

    /// Creates a classifier whose categories carry extra triggers on top of
    /// the built-in ones. Precedence order is unchanged.
    ///
    /// # Errors
    /// Returns an error if a category's combined triggers cannot be compiled.
    pub fn with_settings(settings: &ClassifierSettings) -> Result<Self, regex::Error> {
        let patterns = DEFAULT_TRIGGERS
            .iter()
            .map(|(category, builtin)| {
                let extra = settings
                    .extra_triggers
                    .get(category)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                ErrorPattern::new(
                    *category,
                    builtin.iter().copied().chain(extra.iter().map(String::as_str)),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    fn default_patterns() -> Vec<ErrorPattern> {
        DEFAULT_TRIGGERS
            .iter()
            .map(|(category, triggers)| {
                ErrorPattern::new(*category, triggers.iter())
                    .expect("built-in triggers are short escaped literals")
            })
            .collect()
    }

    /// The configured rules, in precedence order.
    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// Classifies a failure. Never fails: unrecognized input is `unknown`.
    pub fn classify(&self, error: impl Into<ErrorInput>) -> ErrorClassification {
        let error = error.into();
        let message = error.message();
        let category = self.classify_message(&message);

        tracing::debug!(
            category = %category,
            retriable = category.is_retriable(),
            "classified step failure"
        );

        ErrorClassification::new(category, message, error.stack())
    }

    /// Returns the category for a raw message.
    pub fn classify_message(&self, message: &str) -> ErrorCategory {
        let lowered = message.to_lowercase();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(&lowered))
            .map_or(ErrorCategory::Unknown, ErrorPattern::category)
    }

    /// Returns the winning category and the trigger text that decided it.
    pub fn matched_trigger(&self, message: &str) -> Option<(ErrorCategory, String)> {
        let lowered = message.to_lowercase();
        self.patterns.iter().find_map(|pattern| {
            pattern
                .find(&lowered)
                .map(|hit| (pattern.category(), hit.to_string()))
        })
    }
}

/// The shared classifier with the built-in table.
pub fn default_classifier() -> &'static ErrorClassifier {
    static DEFAULT: OnceLock<ErrorClassifier> = OnceLock::new();
    DEFAULT.get_or_init(ErrorClassifier::new)
}

/// Classifies a failure with the built-in table.
pub fn classify(error: impl Into<ErrorInput>) -> ErrorClassification {
    default_classifier().classify(error)
}
