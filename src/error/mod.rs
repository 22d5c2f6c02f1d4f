//! Step failure classification
//!
//! This module turns whatever a failed workflow step produced (a Rust error,
//! a string, a provider's JSON body, or nothing) into an
//! [`ErrorClassification`]: a category from a closed set plus a retriability
//! verdict the engine uses to choose between retrying and dead-lettering.

pub mod classification;
pub mod detector;
pub mod input;

// Re-export main types for convenient access
pub use classification::{
    Disposition, ErrorCategory, ErrorClassification, ParseCategoryError, RETRIABLE_CATEGORIES,
    UNKNOWN_ERROR_MESSAGE,
};
pub use detector::{classify, default_classifier, ErrorClassifier, ErrorPattern};
pub use input::ErrorInput;
