//! Entity change events from the persistent store.
//!
//! The entity store invokes create/update/delete callbacks as commands apply.
//! Those callbacks feed [`EntityChangeEvent`]s into the dispatcher; adapters
//! then derive richer domain events from them. Changes carry a propagate flag:
//! set for committed leader-originated changes, clear for follower-local model
//! replication.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::dispatcher::EventDispatcher;
use super::filter::HasEventType;
use super::handler::EventHandler;
use super::terminator::{TerminatorEvent, TerminatorEventType};

/// Namespace constant for entity change events.
pub const ENTITY_CHANGE_EVENT_NS: &str = "entityChange";

/// Legal entity change event subtypes.
pub const ENTITY_CHANGE_EVENT_TYPES: &[&str] = &["created", "updated", "deleted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityChangeEventType {
    Created,
    Updated,
    Deleted,
}

impl EntityChangeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityChangeEventType::Created => "created",
            EntityChangeEventType::Updated => "updated",
            EntityChangeEventType::Deleted => "deleted",
        }
    }
}

/// A create/update/delete applied to a stored entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityChangeEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: EntityChangeEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub entity_type: String,
    pub entity_id: String,
    /// Set for committed leader-originated changes; clear for model-only
    /// replication copies.
    pub propagate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<Value>,
}

impl EntityChangeEvent {
    pub fn new(
        event_type: EntityChangeEventType,
        event_src_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: ENTITY_CHANGE_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            propagate: false,
            initial_state: None,
            final_state: None,
        }
    }

    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    pub fn with_final_state(mut self, state: Value) -> Self {
        self.final_state = Some(state);
        self
    }
}

impl HasEventType for EntityChangeEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

/// Derives terminator events from terminator entity changes.
///
/// Registered on the entity-change category. The propagate flag on the change
/// is carried onto the terminator event as its propagate indicator, so
/// per-handler suppression of model-only noise keeps working downstream.
pub struct TerminatorEntityChangeAdapter {
    dispatcher: Arc<EventDispatcher>,
}

impl TerminatorEntityChangeAdapter {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    fn state_field(state: Option<&Value>, field: &str) -> String {
        state
            .and_then(|s| s.get(field))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

impl EventHandler<EntityChangeEvent> for TerminatorEntityChangeAdapter {
    fn accept(&self, event: &EntityChangeEvent) {
        if event.entity_type != "terminator" {
            return;
        }

        let event_type = match event.event_type {
            EntityChangeEventType::Created => TerminatorEventType::Created,
            EntityChangeEventType::Updated => TerminatorEventType::Updated,
            EntityChangeEventType::Deleted => TerminatorEventType::Deleted,
        };

        // Deleted entities only carry an initial state.
        let state = event.final_state.as_ref().or(event.initial_state.as_ref());
        let terminator_event = TerminatorEvent::new(
            event_type,
            event.event_src_id.clone(),
            event.entity_id.clone(),
            Self::state_field(state, "routerId"),
            Self::state_field(state, "serviceId"),
        )
        .with_propagate_indicator(event.propagate);

        self.dispatcher.accept_terminator_event(terminator_event);
    }
}
