//! stepguard - failure classification and payload redaction for workflow steps
//!
//! A workflow engine hands every failed step to [`error::classify`] to learn
//! whether the failure is worth retrying, and passes the step's payload
//! through [`redact::redact`] before storing or displaying it. Both are pure,
//! synchronous, and safe to call from any number of threads.
//!
//! ```
//! use serde_json::json;
//! use stepguard::error::{classify, ErrorCategory};
//! use stepguard::redact::redact;
//!
//! let verdict = classify("429 invalid payload");
//! assert_eq!(verdict.category(), ErrorCategory::RateLimit);
//! assert!(verdict.retriable());
//!
//! let clean = redact(&json!({"password": "hunter2", "user": "ada"}));
//! assert_eq!(clean, json!({"password": "[REDACTED]", "user": "ada"}));
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod redact;
pub mod report;

pub use error::{classify, ErrorCategory, ErrorClassification, ErrorClassifier, ErrorInput};
pub use redact::{redact, redact_payload, Payload, Redactor};
pub use report::FailureReport;
