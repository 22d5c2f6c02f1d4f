//! Property-based tests for redaction and classification invariants.

use proptest::prelude::*;
use serde_json::{Map, Value};
use stepguard::error::{classify, ErrorCategory, ErrorInput};
use stepguard::redact::{is_sensitive_key, redact, REDACTED_SENTINEL};

/// Keys that never contain a sensitive fragment.
fn plain_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["id", "name", "url", "region", "count", "items", "meta"])
        .prop_map(str::to_string)
}

/// Keys that always contain a sensitive fragment, in mixed case.
fn sensitive_key() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["Password", "TOKEN", "api_key", "Authorization", "cookie"]),
        "[a-z_]{0,6}",
    )
        .prop_map(|(fragment, suffix)| format!("{}{}", fragment, suffix))
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::String),
    ]
}

/// JSON trees whose keys are drawn from `key`.
fn tree(key: BoxedStrategy<String>) -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((key.clone(), inner), 0..6).prop_map(|entries| {
                Value::Object(entries.into_iter().collect::<Map<String, Value>>())
            }),
        ]
    })
}

fn any_key() -> BoxedStrategy<String> {
    prop_oneof![plain_key(), sensitive_key()].boxed()
}

proptest! {
    #[test]
    fn redaction_is_identity_without_sensitive_keys(value in tree(plain_key().boxed())) {
        prop_assert_eq!(redact(&value), value);
    }

    #[test]
    fn redaction_is_idempotent(value in tree(any_key())) {
        let once = redact(&value);
        prop_assert_eq!(redact(&once), once);
    }

    #[test]
    fn sensitive_values_become_the_sentinel(
        key in sensitive_key(),
        value in tree(any_key()),
    ) {
        let mut map = Map::new();
        map.insert(key.clone(), value);
        let output = redact(&Value::Object(map));
        prop_assert_eq!(&output[key.as_str()], &Value::String(REDACTED_SENTINEL.to_string()));
    }

    #[test]
    fn arrays_keep_length(items in prop::collection::vec(tree(any_key()), 0..8)) {
        let output = redact(&Value::Array(items.clone()));
        prop_assert_eq!(output.as_array().map(Vec::len), Some(items.len()));
    }

    #[test]
    fn generated_sensitive_keys_match_predicate(key in sensitive_key()) {
        prop_assert!(is_sensitive_key(&key));
    }

    #[test]
    fn rate_limit_precedes_validation(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        // "429" wins as long as nothing earlier in the table also matches.
        let message = format!("{}429 invalid{}", prefix, suffix);
        let earlier = [ErrorCategory::Timeout, ErrorCategory::TransientNetwork];
        let category = classify(ErrorInput::error(message.as_str())).category();
        prop_assert!(
            category == ErrorCategory::RateLimit || earlier.contains(&category),
            "unexpected {} for '{}'", category, message
        );
    }

    #[test]
    fn classification_never_panics(text in any::<String>()) {
        let classification = classify(text.as_str());
        prop_assert_eq!(classification.retriable(), classification.category().is_retriable());
        prop_assert!(!classification.message().is_empty());
    }
}
