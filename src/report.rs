//! Dead-letter records for failed steps.
//!
//! A [`FailureReport`] is what the workflow engine stores when a step fails:
//! the classification verdict next to a redacted copy of the step payload.
//! The field names match the dead-letter queue schema (`errorCategory`,
//! `failureReason`, `errorStack`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Disposition, ErrorCategory, ErrorClassification, ErrorClassifier, ErrorInput};
use crate::redact::{Payload, Redactor};

/// A classified, redacted failure ready for storage or display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    pub error_category: ErrorCategory,
    pub retriable: bool,
    pub disposition: Disposition,
    pub failure_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stack: Option<String>,
    /// Step payload with sensitive values masked
    pub payload: Value,
    pub recorded_at: DateTime<Utc>,
}

impl FailureReport {
    /// Builds a report from a classification and an already redacted payload.
    pub fn new(classification: &ErrorClassification, redacted_payload: Value) -> Self {
        Self {
            step_id: None,
            step_type: None,
            error_category: classification.category(),
            retriable: classification.retriable(),
            disposition: classification.disposition(),
            failure_reason: classification.message().to_string(),
            error_stack: classification.stack().map(str::to_string),
            payload: redacted_payload,
            recorded_at: Utc::now(),
        }
    }

    /// Classifies `error` and redacts `payload` in one step.
    pub fn capture(
        classifier: &ErrorClassifier,
        redactor: &Redactor,
        error: impl Into<ErrorInput>,
        payload: &Value,
    ) -> Self {
        let classification = classifier.classify(error);
        Self::new(&classification, redactor.redact_value(payload))
    }

    /// Like [`FailureReport::capture`], for payload graphs that may alias or
    /// contain cycles.
    pub fn capture_payload(
        classifier: &ErrorClassifier,
        redactor: &Redactor,
        error: impl Into<ErrorInput>,
        payload: &Payload,
    ) -> Self {
        let classification = classifier.classify(error);
        Self::new(&classification, redactor.redact_payload(payload))
    }

    /// Attaches the failing step's identifiers.
    pub fn with_step(mut self, step_id: impl Into<String>, step_type: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self.step_type = Some(step_type.into());
        self
    }

    pub fn should_retry(&self) -> bool {
        self.disposition == Disposition::Retry
    }
}
