//! Metrics events and the raw-counter splitting adapter.
//!
//! Routers and controllers report raw counter batches with dotted names like
//! `ctrl.3tOOkKfDn.tx.bytesrate`, where the middle segment(s) are an embedded
//! entity id. The adapter splits such a batch into per-entity
//! [`MetricsEvent`]s so subscribers see `ctrl.tx.bytesrate` scoped to entity
//! `3tOOkKfDn`. Entity ids may themselves contain dots; parsing relies on the
//! metric suffix having a fixed segment count, not on the id being dot-free.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dispatcher::EventDispatcher;
use super::handler::EventHandler;

/// Namespace constant for metrics events.
pub const METRICS_EVENT_NS: &str = "metrics";

/// A batch of metric values from one source (optionally one entity).
#[derive(Debug, Clone, Serialize)]
pub struct MetricsEvent {
    pub namespace: &'static str,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    /// Component that reported the values, e.g. a router id.
    pub source_id: String,
    /// Entity the values are scoped to, when split out of a dotted name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<String>,
    /// Metric name to value.
    pub metrics: HashMap<String, f64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl MetricsEvent {
    pub fn new(
        event_src_id: impl Into<String>,
        source_id: impl Into<String>,
        metrics: HashMap<String, f64>,
    ) -> Self {
        Self {
            namespace: METRICS_EVENT_NS,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            source_id: source_id.into(),
            source_entity_id: None,
            metrics,
            tags: HashMap::new(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.source_entity_id = Some(entity_id.into());
        self
    }
}

/// Split a dotted metric name into its base name and embedded entity id.
///
/// `name` must start with `prefix`; the trailing `suffix_segments` dot-separated
/// segments form the metric suffix, and everything between prefix and suffix is
/// the entity id. Because the suffix length is fixed, ids containing dots parse
/// correctly.
///
/// ```
/// use fabricmesh::events::extract_id;
///
/// let (metric, entity_id) = extract_id("ctrl.3tOOkKfDn.tx.bytesrate", "ctrl.", 2).unwrap();
/// assert_eq!(metric, "ctrl.tx.bytesrate");
/// assert_eq!(entity_id, "3tOOkKfDn");
/// ```
pub fn extract_id(name: &str, prefix: &str, suffix_segments: usize) -> Option<(String, String)> {
    let rest = name.strip_prefix(prefix)?;
    let segments: Vec<&str> = rest.split('.').collect();
    if segments.len() <= suffix_segments {
        return None;
    }
    let split_at = segments.len() - suffix_segments;
    let entity_id = segments[..split_at].join(".");
    let metric = format!("{}{}", prefix, segments[split_at..].join("."));
    Some((metric, entity_id))
}

/// Translates raw counter batches into per-entity metrics events.
///
/// Names matching one of the configured `(prefix, suffix_segments)` rules are
/// grouped by extracted entity id; names matching no rule stay on a single
/// unscoped event for the reporting source.
pub struct MetricsAdapter {
    dispatcher: Arc<EventDispatcher>,
    event_src_id: String,
    entity_rules: Vec<(String, usize)>,
}

impl MetricsAdapter {
    pub fn new(dispatcher: Arc<EventDispatcher>, event_src_id: impl Into<String>) -> Self {
        Self {
            dispatcher,
            event_src_id: event_src_id.into(),
            entity_rules: vec![("ctrl.".to_string(), 2), ("link.".to_string(), 2)],
        }
    }

    pub fn with_entity_rule(mut self, prefix: impl Into<String>, suffix_segments: usize) -> Self {
        self.entity_rules.push((prefix.into(), suffix_segments));
        self
    }

    /// Accept one raw counter batch from `source_id` and dispatch the
    /// resulting metrics events.
    pub fn accept_raw(&self, source_id: &str, values: HashMap<String, f64>) {
        let mut per_entity: HashMap<String, HashMap<String, f64>> = HashMap::new();
        let mut unscoped: HashMap<String, f64> = HashMap::new();

        for (name, value) in values {
            match self.split(&name) {
                Some((metric, entity_id)) => {
                    per_entity.entry(entity_id).or_default().insert(metric, value);
                }
                None => {
                    unscoped.insert(name, value);
                }
            }
        }

        for (entity_id, metrics) in per_entity {
            let event = MetricsEvent::new(self.event_src_id.clone(), source_id, metrics)
                .with_entity_id(entity_id);
            self.dispatcher.accept_metrics_event(event);
        }
        if !unscoped.is_empty() {
            let event = MetricsEvent::new(self.event_src_id.clone(), source_id, unscoped);
            self.dispatcher.accept_metrics_event(event);
        }
    }

    fn split(&self, name: &str) -> Option<(String, String)> {
        self.entity_rules
            .iter()
            .find_map(|(prefix, suffix)| extract_id(name, prefix, *suffix))
    }
}

/// Decorator that restricts which metric keys a subscriber sees.
///
/// Forwards the original event untouched when nothing would be removed;
/// otherwise delivers a trimmed copy. Events left empty are dropped.
pub struct MetricsKeyFilter {
    inner: Arc<dyn EventHandler<MetricsEvent>>,
    include: HashSet<String>,
}

impl MetricsKeyFilter {
    pub fn new(
        inner: Arc<dyn EventHandler<MetricsEvent>>,
        include: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            inner,
            include: include.into_iter().collect(),
        }
    }
}

impl EventHandler<MetricsEvent> for MetricsKeyFilter {
    fn accept(&self, event: &MetricsEvent) {
        if event.metrics.keys().all(|k| self.include.contains(k)) {
            self.inner.accept(event);
            return;
        }

        let metrics: HashMap<String, f64> = event
            .metrics
            .iter()
            .filter(|(k, _)| self.include.contains(*k))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if metrics.is_empty() {
            return;
        }

        let mut filtered = event.clone();
        filtered.metrics = metrics;
        self.inner.accept(&filtered);
    }

    fn wraps(&self, candidate: &Arc<dyn EventHandler<MetricsEvent>>) -> bool {
        Arc::ptr_eq(&self.inner, candidate) || self.inner.wraps(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_id_basic() {
        let (metric, entity_id) = extract_id("ctrl.3tOOkKfDn.tx.bytesrate", "ctrl.", 2).unwrap();
        assert_eq!(metric, "ctrl.tx.bytesrate");
        assert_eq!(entity_id, "3tOOkKfDn");
    }

    #[test]
    fn test_extract_id_with_dotted_entity_id() {
        let (metric, entity_id) = extract_id("ctrl.3tO.kKfDn.tx.bytesrate", "ctrl.", 2).unwrap();
        assert_eq!(metric, "ctrl.tx.bytesrate");
        assert_eq!(entity_id, "3tO.kKfDn");
    }

    #[test]
    fn test_extract_id_single_suffix_segment() {
        let (metric, entity_id) = extract_id("link.l1.latency", "link.", 1).unwrap();
        assert_eq!(metric, "link.latency");
        assert_eq!(entity_id, "l1");
    }

    #[test]
    fn test_extract_id_rejects_wrong_prefix() {
        assert!(extract_id("router.r1.tx.bytesrate", "ctrl.", 2).is_none());
    }

    #[test]
    fn test_extract_id_rejects_missing_entity_segment() {
        // Nothing left over for the id once the suffix is consumed.
        assert!(extract_id("ctrl.tx.bytesrate", "ctrl.", 2).is_none());
    }

    #[test]
    fn test_key_filter_trims_keys() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder {
            seen: Mutex<Vec<MetricsEvent>>,
        }

        impl EventHandler<MetricsEvent> for Recorder {
            fn accept(&self, event: &MetricsEvent) {
                self.seen.lock().unwrap().push(event.clone());
            }
        }

        let recorder = Arc::new(Recorder::default());
        let filter = MetricsKeyFilter::new(
            recorder.clone() as Arc<dyn EventHandler<_>>,
            ["m1_rate".to_string(), "count".to_string()],
        );

        let metrics: HashMap<String, f64> = [
            ("m1_rate", 1.0),
            ("m5_rate", 2.0),
            ("m15_rate", 3.0),
            ("mean_rate", 4.0),
            ("count", 5.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        filter.accept(&MetricsEvent::new("ctrl1", "r1", metrics));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let mut keys: Vec<_> = seen[0].metrics.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["count", "m1_rate"]);
    }
}
