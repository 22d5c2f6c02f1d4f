//! Error classification types for workflow step failures
//!
//! A failure is assigned exactly one [`ErrorCategory`]. Whether the failure is
//! worth retrying is a property of the category alone, so
//! [`ErrorClassification`] never stores a retriability flag that could drift
//! from its category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Message used when nothing readable can be extracted from a failure.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// The category of a step failure.
///
/// Variants are declared in matching precedence order: when a message
/// matches the triggers of several categories, the earliest one wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The operation exceeded a time limit.
    Timeout,
    /// Connection-level failure (reset, refused, DNS, unreachable host).
    TransientNetwork,
    /// The provider is throttling requests (HTTP 429).
    RateLimit,
    /// Server-side provider failure (HTTP 5xx).
    #[serde(rename = "provider_5xx")]
    Provider5xx,
    /// Client-side provider rejection (HTTP 401/403/404).
    #[serde(rename = "provider_4xx")]
    Provider4xx,
    /// The step is missing configuration it needs to run.
    MissingConfig,
    /// The step input or payload was rejected as invalid.
    Validation,
    /// No rule matched.
    Unknown,
}

/// Categories for which re-attempting the step has a reasonable chance of success.
pub const RETRIABLE_CATEGORIES: [ErrorCategory; 4] = [
    ErrorCategory::Timeout,
    ErrorCategory::TransientNetwork,
    ErrorCategory::RateLimit,
    ErrorCategory::Provider5xx,
];

impl ErrorCategory {
    /// Every category, in matching precedence order.
    pub const ALL: [ErrorCategory; 8] = [
        ErrorCategory::Timeout,
        ErrorCategory::TransientNetwork,
        ErrorCategory::RateLimit,
        ErrorCategory::Provider5xx,
        ErrorCategory::Provider4xx,
        ErrorCategory::MissingConfig,
        ErrorCategory::Validation,
        ErrorCategory::Unknown,
    ];

    /// Returns true if failures in this category should be retried.
    ///
    /// Deliberately exhaustive: a new variant will not compile until it is
    /// given a verdict here.
    pub fn is_retriable(self) -> bool {
        match self {
            ErrorCategory::Timeout
            | ErrorCategory::TransientNetwork
            | ErrorCategory::RateLimit
            | ErrorCategory::Provider5xx => true,
            ErrorCategory::Provider4xx
            | ErrorCategory::MissingConfig
            | ErrorCategory::Validation
            | ErrorCategory::Unknown => false,
        }
    }

    /// The stable snake_case name, as stored in dead-letter records.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::TransientNetwork => "transient_network",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Provider5xx => "provider_5xx",
            ErrorCategory::Provider4xx => "provider_4xx",
            ErrorCategory::MissingConfig => "missing_config",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a category name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for ErrorCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ErrorCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// What the engine should do with a failed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Schedule another attempt.
    Retry,
    /// Park the step in the dead-letter queue.
    DeadLetter,
}

/// The outcome of classifying a single failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorClassification {
    category: ErrorCategory,
    retriable: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl ErrorClassification {
    /// Creates a classification; retriability is derived from `category`.
    pub fn new(category: ErrorCategory, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            category,
            retriable: category.is_retriable(),
            message: message.into(),
            stack,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn retriable(&self) -> bool {
        self.retriable
    }

    /// The human-readable message extracted from the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stack trace, when the failure carried one.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Routing verdict for the engine.
    pub fn disposition(&self) -> Disposition {
        if self.retriable {
            Disposition::Retry
        } else {
            Disposition::DeadLetter
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

impl std::error::Error for ErrorClassification {}
