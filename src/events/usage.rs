//! Circuit usage events, schema versions 2 and 3.
//!
//! Version 2 carries one counter per event. Version 3 batches every usage
//! counter for a circuit interval into a single map, so high-circuit-count
//! deployments emit far fewer events. The two versions are independent
//! dispatcher categories; registration picks one via the `version` option.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;
use super::handler::EventHandler;

/// Namespace constant shared by both usage schema versions.
pub const USAGE_EVENT_NS: &str = "fabric.usage";

/// Legal usage (v2) event subtypes.
pub const USAGE_EVENT_TYPES: &[&str] = &[
    "usage.ingress.rx",
    "usage.ingress.tx",
    "usage.egress.rx",
    "usage.egress.tx",
    "usage.fabric.rx",
    "usage.fabric.tx",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsageEventType {
    #[serde(rename = "usage.ingress.rx")]
    IngressRx,
    #[serde(rename = "usage.ingress.tx")]
    IngressTx,
    #[serde(rename = "usage.egress.rx")]
    EgressRx,
    #[serde(rename = "usage.egress.tx")]
    EgressTx,
    #[serde(rename = "usage.fabric.rx")]
    FabricRx,
    #[serde(rename = "usage.fabric.tx")]
    FabricTx,
}

impl UsageEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageEventType::IngressRx => "usage.ingress.rx",
            UsageEventType::IngressTx => "usage.ingress.tx",
            UsageEventType::EgressRx => "usage.egress.rx",
            UsageEventType::EgressTx => "usage.egress.tx",
            UsageEventType::FabricRx => "usage.fabric.rx",
            UsageEventType::FabricTx => "usage.fabric.tx",
        }
    }
}

/// A single usage counter for one circuit interval (schema version 2).
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    pub namespace: &'static str,
    pub version: u32,
    #[serde(rename = "eventType")]
    pub event_type: UsageEventType,
    pub event_src_id: String,
    pub source_id: String,
    pub circuit_id: String,
    pub usage: u64,
    pub interval_start: DateTime<Utc>,
    pub interval_length_secs: u64,
}

impl UsageEvent {
    pub fn new(
        event_type: UsageEventType,
        event_src_id: impl Into<String>,
        source_id: impl Into<String>,
        circuit_id: impl Into<String>,
        usage: u64,
    ) -> Self {
        Self {
            namespace: USAGE_EVENT_NS,
            version: 2,
            event_type,
            event_src_id: event_src_id.into(),
            source_id: source_id.into(),
            circuit_id: circuit_id.into(),
            usage,
            interval_start: Utc::now(),
            interval_length_secs: 60,
        }
    }
}

impl HasEventType for UsageEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

/// All usage counters for one circuit interval (schema version 3).
#[derive(Debug, Clone, Serialize)]
pub struct UsageEventV3 {
    pub namespace: &'static str,
    pub version: u32,
    pub event_src_id: String,
    pub source_id: String,
    pub circuit_id: String,
    /// Counter name (e.g. `"ingress.rx"`) to byte count.
    pub usage: HashMap<String, u64>,
    pub interval_start: DateTime<Utc>,
    pub interval_length_secs: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl UsageEventV3 {
    pub fn new(
        event_src_id: impl Into<String>,
        source_id: impl Into<String>,
        circuit_id: impl Into<String>,
        usage: HashMap<String, u64>,
    ) -> Self {
        Self {
            namespace: USAGE_EVENT_NS,
            version: 3,
            event_src_id: event_src_id.into(),
            source_id: source_id.into(),
            circuit_id: circuit_id.into(),
            usage,
            interval_start: Utc::now(),
            interval_length_secs: 60,
            tags: HashMap::new(),
        }
    }
}

/// Decorator that restricts which usage keys a v3 subscriber sees.
///
/// When every key in the event is already in the include set, the original
/// event is forwarded untouched; a trimmed copy is only built when filtering
/// actually removes something. Events left with no keys at all are dropped.
pub struct UsageKeyFilter {
    inner: Arc<dyn EventHandler<UsageEventV3>>,
    include: std::collections::HashSet<String>,
}

impl UsageKeyFilter {
    pub fn new(
        inner: Arc<dyn EventHandler<UsageEventV3>>,
        include: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            inner,
            include: include.into_iter().collect(),
        }
    }
}

impl EventHandler<UsageEventV3> for UsageKeyFilter {
    fn accept(&self, event: &UsageEventV3) {
        if event.usage.keys().all(|k| self.include.contains(k)) {
            self.inner.accept(event);
            return;
        }

        let usage: HashMap<String, u64> = event
            .usage
            .iter()
            .filter(|(k, _)| self.include.contains(*k))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if usage.is_empty() {
            return;
        }

        let mut filtered = event.clone();
        filtered.usage = usage;
        self.inner.accept(&filtered);
    }

    fn wraps(&self, candidate: &Arc<dyn EventHandler<UsageEventV3>>) -> bool {
        Arc::ptr_eq(&self.inner, candidate) || self.inner.wraps(candidate)
    }
}
