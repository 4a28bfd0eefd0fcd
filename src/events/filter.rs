//! Subtype filtering and registration configuration parsing.
//!
//! Dynamic handler registration accepts an opaque configuration mapping
//! (`serde_json::Map`). The recognized options are:
//!
//! - `include`: a single string or a list of strings restricting delivered
//!   subtypes (or, for metrics and usage-v3 handlers, the keys delivered
//!   inside each event)
//! - `propagateAlways`: boolean or boolean-valued string, bypasses model-event
//!   suppression for terminator events
//! - `version`: integer 2 or 3, selects the usage-event schema version

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::handler::EventHandler;
use super::RegistrationError;

/// Configuration mapping passed to dynamic handler registration.
pub type HandlerConfig = serde_json::Map<String, Value>;

/// Events that expose a subtype string for include filtering.
pub trait HasEventType {
    fn event_type_str(&self) -> &str;
}

/// Decorator that forwards only events whose subtype is in the include set.
pub struct IncludeFilter<E> {
    inner: Arc<dyn EventHandler<E>>,
    include: HashSet<String>,
}

impl<E> IncludeFilter<E> {
    pub fn new(inner: Arc<dyn EventHandler<E>>, include: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            include: include.into_iter().collect(),
        }
    }
}

impl<E: HasEventType> EventHandler<E> for IncludeFilter<E> {
    fn accept(&self, event: &E) {
        if self.include.contains(event.event_type_str()) {
            self.inner.accept(event);
        }
    }

    fn wraps(&self, candidate: &Arc<dyn EventHandler<E>>) -> bool {
        Arc::ptr_eq(&self.inner, candidate) || self.inner.wraps(candidate)
    }
}

/// Parse the `include` option: a single string or a list of strings.
pub fn parse_include(config: &HandlerConfig) -> Result<Option<Vec<String>>, RegistrationError> {
    match config.get("include") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(Value::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => values.push(s.to_string()),
                    None => {
                        return Err(RegistrationError::InvalidOption {
                            key: "include",
                            detail: format!("expected string entries, got {item}"),
                        });
                    }
                }
            }
            Ok(Some(values))
        }
        Some(other) => Err(RegistrationError::InvalidOption {
            key: "include",
            detail: format!("expected string or list of strings, got {other}"),
        }),
    }
}

/// Validate include values against a category's legal subtype enumeration.
pub fn validate_include(
    values: &[String],
    legal: &'static [&'static str],
) -> Result<(), RegistrationError> {
    for value in values {
        if !legal.contains(&value.as_str()) {
            return Err(RegistrationError::InvalidInclude {
                value: value.clone(),
                legal,
            });
        }
    }
    Ok(())
}

/// Parse the `propagateAlways` option: boolean or boolean-valued string.
pub fn parse_propagate_always(config: &HandlerConfig) -> Result<bool, RegistrationError> {
    match config.get("propagateAlways") {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => s.parse::<bool>().map_err(|_| {
            RegistrationError::InvalidOption {
                key: "propagateAlways",
                detail: format!("expected boolean or boolean-valued string, got {s:?}"),
            }
        }),
        Some(other) => Err(RegistrationError::InvalidOption {
            key: "propagateAlways",
            detail: format!("expected boolean or boolean-valued string, got {other}"),
        }),
    }
}

/// Parse the `version` option for usage handlers. Defaults to 2.
pub fn parse_usage_version(config: &HandlerConfig) -> Result<i64, RegistrationError> {
    match config.get("version") {
        None => Ok(2),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v @ (2 | 3)) => Ok(v),
            Some(v) => Err(RegistrationError::UnsupportedVersion { version: v }),
            None => Err(RegistrationError::InvalidOption {
                key: "version",
                detail: format!("expected integer, got {n}"),
            }),
        },
        Some(other) => Err(RegistrationError::InvalidOption {
            key: "version",
            detail: format!("expected integer, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Tagged(&'static str);

    impl HasEventType for Tagged {
        fn event_type_str(&self) -> &str {
            self.0
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl EventHandler<Tagged> for Recorder {
        fn accept(&self, event: &Tagged) {
            self.seen.lock().unwrap().push(event.0);
        }
    }

    fn config(pairs: &[(&str, Value)]) -> HandlerConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_include_filter_forwards_only_included() {
        let recorder = Arc::new(Recorder::default());
        let filter = IncludeFilter::new(
            recorder.clone() as Arc<dyn EventHandler<Tagged>>,
            ["created".to_string()],
        );
        filter.accept(&Tagged("created"));
        filter.accept(&Tagged("deleted"));
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), &["created"]);
    }

    #[test]
    fn test_include_filter_reports_wrapping() {
        let recorder: Arc<dyn EventHandler<Tagged>> = Arc::new(Recorder::default());
        let other: Arc<dyn EventHandler<Tagged>> = Arc::new(Recorder::default());
        let filter = IncludeFilter::new(recorder.clone(), ["created".to_string()]);
        assert!(filter.wraps(&recorder));
        assert!(!filter.wraps(&other));
    }

    #[test]
    fn test_parse_include_single_string() {
        let cfg = config(&[("include", json!("created"))]);
        assert_eq!(
            parse_include(&cfg).unwrap(),
            Some(vec!["created".to_string()])
        );
    }

    #[test]
    fn test_parse_include_list() {
        let cfg = config(&[("include", json!(["created", "deleted"]))]);
        assert_eq!(
            parse_include(&cfg).unwrap(),
            Some(vec!["created".to_string(), "deleted".to_string()])
        );
    }

    #[test]
    fn test_parse_include_absent() {
        assert_eq!(parse_include(&HandlerConfig::new()).unwrap(), None);
    }

    #[test]
    fn test_parse_include_rejects_non_string() {
        let cfg = config(&[("include", json!(42))]);
        assert!(parse_include(&cfg).is_err());
        let cfg = config(&[("include", json!(["created", 42]))]);
        assert!(parse_include(&cfg).is_err());
    }

    #[test]
    fn test_validate_include_lists_legal_set() {
        const LEGAL: &[&str] = &["created", "deleted"];
        let err = validate_include(&["bogus".to_string()], LEGAL).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bogus"));
        assert!(message.contains("created"));
        assert!(message.contains("deleted"));
    }

    #[test]
    fn test_parse_propagate_always_variants() {
        assert!(!parse_propagate_always(&HandlerConfig::new()).unwrap());
        assert!(parse_propagate_always(&config(&[("propagateAlways", json!(true))])).unwrap());
        assert!(parse_propagate_always(&config(&[("propagateAlways", json!("true"))])).unwrap());
        assert!(!parse_propagate_always(&config(&[("propagateAlways", json!("false"))])).unwrap());
        assert!(parse_propagate_always(&config(&[("propagateAlways", json!("yes"))])).is_err());
        assert!(parse_propagate_always(&config(&[("propagateAlways", json!(1))])).is_err());
    }

    #[test]
    fn test_parse_usage_version() {
        assert_eq!(parse_usage_version(&HandlerConfig::new()).unwrap(), 2);
        assert_eq!(
            parse_usage_version(&config(&[("version", json!(3))])).unwrap(),
            3
        );
        let err = parse_usage_version(&config(&[("version", json!(4))])).unwrap_err();
        assert!(err.to_string().contains('4'));
    }
}
