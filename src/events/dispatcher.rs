//! The multi-category event dispatcher.
//!
//! One [`EventDispatcher`] instance is constructed per controller and passed
//! by reference to every component that publishes or subscribes; there is no
//! ambient singleton, so tests build isolated instances freely.
//!
//! # Delivery
//!
//! Each category owns an independent handler list. Accepting an event never
//! blocks the producer on consumer behavior:
//!
//! - **Ordered categories** (cluster, router, service, terminator, circuit,
//!   link, usage v2/v3, metrics, entity-change) enqueue onto an unbounded
//!   per-category channel drained by one dispatch task. Every handler observes
//!   that category's events in acceptance order.
//! - **Concurrent categories** (api-session, sdk, connect) spawn one delivery
//!   task per handler per event. No ordering across handlers or events, no
//!   aggregate synchronization.
//!
//! In both patterns a panicking handler is caught, logged, and counted; it
//! never reaches the producer and never stops delivery to sibling handlers.
//!
//! # Registration
//!
//! Typed `add_*`/`remove_*` methods take the category's handler trait object
//! directly. The dynamic `register_*`/`unregister_*` methods instead take an
//! opaque [`HandlerCapabilities`] value plus a configuration mapping, verify
//! the value actually supports the category, and apply `include` /
//! `propagateAlways` / `version` options. Removal sees through filter
//! decorators via [`EventHandler::wraps`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::metrics;
use crate::runtime::RuntimeHandles;

use super::RegistrationError;
use super::circuit::{CIRCUIT_EVENT_TYPES, CircuitEvent};
use super::cluster::{CLUSTER_EVENT_TYPES, ClusterEvent};
use super::connect::{CONNECT_EVENT_TYPES, ConnectEvent};
use super::entity::{ENTITY_CHANGE_EVENT_TYPES, EntityChangeEvent};
use super::fabric::{LINK_EVENT_TYPES, LinkEvent, ROUTER_EVENT_TYPES, RouterEvent};
use super::filter::{
    HandlerConfig, IncludeFilter, parse_include, parse_propagate_always, parse_usage_version,
    validate_include,
};
use super::handler::{EventHandler, HandlerList};
use super::metrics::{MetricsEvent, MetricsKeyFilter};
use super::service::{SERVICE_EVENT_TYPES, ServiceEvent};
use super::session::{
    API_SESSION_EVENT_TYPES, ApiSessionEvent, SDK_EVENT_TYPES, SdkEvent,
};
use super::terminator::{PropagationFilter, TERMINATOR_EVENT_TYPES, TerminatorEvent};
use super::usage::{USAGE_EVENT_TYPES, UsageEvent, UsageEventV3, UsageKeyFilter};

/// Deliver one event to every handler in the snapshot, isolating panics.
fn deliver_all<E>(namespace: &'static str, handlers: &[Arc<dyn EventHandler<E>>], event: &E) {
    for handler in handlers {
        if catch_unwind(AssertUnwindSafe(|| handler.accept(event))).is_err() {
            metrics::record_handler_panic(namespace);
            error!(namespace, "event handler panicked during delivery");
        }
    }
}

/// Category whose events are delivered in acceptance order by one dispatch
/// task.
struct OrderedCategory<E> {
    namespace: &'static str,
    list: Arc<HandlerList<E>>,
    tx: mpsc::UnboundedSender<E>,
}

impl<E: Send + 'static> OrderedCategory<E> {
    fn new(namespace: &'static str, handle: &Handle) -> Self {
        let list = Arc::new(HandlerList::new());
        let (tx, mut rx) = mpsc::unbounded_channel::<E>();
        let dispatch_list = list.clone();
        handle.spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver_all(namespace, &dispatch_list.snapshot(), &event);
            }
            debug!(namespace, "event dispatch task stopped");
        });
        Self {
            namespace,
            list,
            tx,
        }
    }

    fn add(&self, handler: Arc<dyn EventHandler<E>>) {
        self.list.append(handler);
        metrics::set_registered_handlers(self.namespace, self.list.len() as i64);
    }

    fn remove(&self, handler: &Arc<dyn EventHandler<E>>) {
        self.list.remove(handler);
        metrics::set_registered_handlers(self.namespace, self.list.len() as i64);
    }

    fn accept(&self, event: E) {
        metrics::record_event_dispatched(self.namespace);
        if self.tx.send(event).is_err() {
            // Dispatch task is gone; only happens once the runtime is shutting
            // down, so the event is dropped.
            debug!(namespace = self.namespace, "dropping event, dispatcher stopped");
        }
    }
}

/// Category that spawns one delivery task per handler per event.
struct ConcurrentCategory<E> {
    namespace: &'static str,
    list: Arc<HandlerList<E>>,
    handle: Handle,
}

impl<E: Send + Sync + 'static> ConcurrentCategory<E> {
    fn new(namespace: &'static str, handle: &Handle) -> Self {
        Self {
            namespace,
            list: Arc::new(HandlerList::new()),
            handle: handle.clone(),
        }
    }

    fn add(&self, handler: Arc<dyn EventHandler<E>>) {
        self.list.append(handler);
        metrics::set_registered_handlers(self.namespace, self.list.len() as i64);
    }

    fn remove(&self, handler: &Arc<dyn EventHandler<E>>) {
        self.list.remove(handler);
        metrics::set_registered_handlers(self.namespace, self.list.len() as i64);
    }

    fn accept(&self, event: E) {
        metrics::record_event_dispatched(self.namespace);
        let event = Arc::new(event);
        let namespace = self.namespace;
        for handler in self.list.snapshot() {
            let event = event.clone();
            self.handle.spawn(async move {
                if catch_unwind(AssertUnwindSafe(|| handler.accept(&event))).is_err() {
                    metrics::record_handler_panic(namespace);
                    error!(namespace, "event handler panicked during delivery");
                }
            });
        }
    }
}

/// Opaque registration value for the dynamic `register_*` methods.
///
/// A type advertises support for an event category by overriding the matching
/// accessor to return itself; the default for every accessor is `None`, which
/// registration reports as a capability mismatch naming the required
/// capability.
///
/// ```
/// use std::sync::Arc;
/// use fabricmesh::events::{ClusterEvent, EventHandler, HandlerCapabilities};
///
/// struct AuditSink;
///
/// impl EventHandler<ClusterEvent> for AuditSink {
///     fn accept(&self, _event: &ClusterEvent) {}
/// }
///
/// impl HandlerCapabilities for AuditSink {
///     fn cluster_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<ClusterEvent>>> {
///         Some(self)
///     }
/// }
/// ```
pub trait HandlerCapabilities: Send + Sync + 'static {
    fn cluster_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<ClusterEvent>>> {
        None
    }

    fn router_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<RouterEvent>>> {
        None
    }

    fn service_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<ServiceEvent>>> {
        None
    }

    fn terminator_event_handler(
        self: Arc<Self>,
    ) -> Option<Arc<dyn EventHandler<TerminatorEvent>>> {
        None
    }

    fn circuit_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<CircuitEvent>>> {
        None
    }

    fn link_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<LinkEvent>>> {
        None
    }

    fn usage_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<UsageEvent>>> {
        None
    }

    fn usage_event_v3_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<UsageEventV3>>> {
        None
    }

    fn metrics_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<MetricsEvent>>> {
        None
    }

    fn api_session_event_handler(
        self: Arc<Self>,
    ) -> Option<Arc<dyn EventHandler<ApiSessionEvent>>> {
        None
    }

    fn sdk_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<SdkEvent>>> {
        None
    }

    fn connect_event_handler(self: Arc<Self>) -> Option<Arc<dyn EventHandler<ConnectEvent>>> {
        None
    }

    fn entity_change_event_handler(
        self: Arc<Self>,
    ) -> Option<Arc<dyn EventHandler<EntityChangeEvent>>> {
        None
    }
}

/// Expands the typed add/remove/accept triple for an ordered or concurrent
/// category field.
macro_rules! category_api {
    ($add:ident, $remove:ident, $accept:ident, $field:ident, $event:ty) => {
        #[doc = concat!("Append a handler to the ", stringify!($field), " category.")]
        ///
        /// Appending the same handler twice yields duplicate delivery.
        pub fn $add(&self, handler: Arc<dyn EventHandler<$event>>) {
            self.$field.add(handler);
        }

        #[doc = concat!("Remove a handler from the ", stringify!($field), " category by identity,")]
        /// unwrapping filter decorators as needed.
        pub fn $remove(&self, handler: &Arc<dyn EventHandler<$event>>) {
            self.$field.remove(handler);
        }

        #[doc = concat!("Deliver an event to every ", stringify!($field), " handler.")]
        ///
        /// Never blocks on a slow or failing handler.
        pub fn $accept(&self, event: $event) {
            self.$field.accept(event);
        }
    };
}

/// Expands dynamic registration for a category whose `include` option filters
/// delivered subtypes.
macro_rules! subtype_registration {
    ($register:ident, $unregister:ident, $field:ident, $event:ty, $accessor:ident, $required:expr, $legal:expr) => {
        #[doc = concat!("Register `value` on the ", stringify!($field), " category.")]
        ///
        /// Fails if `value` does not support the category's handler capability
        /// or if the `include` option names an unknown subtype.
        pub fn $register(
            &self,
            value: &Arc<dyn HandlerCapabilities>,
            config: &HandlerConfig,
        ) -> Result<(), RegistrationError> {
            let handler = value
                .clone()
                .$accessor()
                .ok_or(RegistrationError::CapabilityMismatch {
                    required: $required,
                })?;
            let handler = match parse_include(config)? {
                Some(include) => {
                    validate_include(&include, $legal)?;
                    Arc::new(IncludeFilter::new(handler, include)) as Arc<dyn EventHandler<$event>>
                }
                None => handler,
            };
            self.$field.add(handler);
            Ok(())
        }

        #[doc = concat!("Unregister `value` from the ", stringify!($field), " category,")]
        /// tolerant of the stored entry being a filter decorator.
        pub fn $unregister(&self, value: &Arc<dyn HandlerCapabilities>) {
            if let Some(handler) = value.clone().$accessor() {
                self.$field.remove(&handler);
            }
        }
    };
}

/// Registry-and-fanout core: one independent handler list per event category.
pub struct EventDispatcher {
    cluster: OrderedCategory<ClusterEvent>,
    router: OrderedCategory<RouterEvent>,
    service: OrderedCategory<ServiceEvent>,
    terminator: OrderedCategory<TerminatorEvent>,
    circuit: OrderedCategory<CircuitEvent>,
    link: OrderedCategory<LinkEvent>,
    usage: OrderedCategory<UsageEvent>,
    usage_v3: OrderedCategory<UsageEventV3>,
    metrics: OrderedCategory<MetricsEvent>,
    entity_change: OrderedCategory<EntityChangeEvent>,
    api_session: ConcurrentCategory<ApiSessionEvent>,
    sdk: ConcurrentCategory<SdkEvent>,
    connect: ConcurrentCategory<ConnectEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher whose dispatch tasks run on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Production processes that
    /// split their runtimes should use [`Self::with_handles`] instead so
    /// fan-out lands on the event plane.
    pub fn new() -> Self {
        Self::with_runtime(&Handle::current())
    }

    /// Create a dispatcher whose dispatch tasks run on the event plane of
    /// `handles`.
    ///
    /// This is the production wiring for
    /// [`ControllerRuntimes`](crate::runtime::ControllerRuntimes): delivery
    /// work cannot starve control-plane tasks because it runs on its own
    /// runtime.
    pub fn with_handles(handles: &RuntimeHandles) -> Self {
        Self::with_runtime(&handles.events)
    }

    /// Create a dispatcher whose dispatch tasks run on `handle`.
    pub fn with_runtime(handle: &Handle) -> Self {
        Self {
            cluster: OrderedCategory::new(super::cluster::CLUSTER_EVENT_NS, handle),
            router: OrderedCategory::new(super::fabric::ROUTER_EVENT_NS, handle),
            service: OrderedCategory::new(super::service::SERVICE_EVENT_NS, handle),
            terminator: OrderedCategory::new(super::terminator::TERMINATOR_EVENT_NS, handle),
            circuit: OrderedCategory::new(super::circuit::CIRCUIT_EVENT_NS, handle),
            link: OrderedCategory::new(super::fabric::LINK_EVENT_NS, handle),
            usage: OrderedCategory::new(super::usage::USAGE_EVENT_NS, handle),
            usage_v3: OrderedCategory::new("fabric.usage.v3", handle),
            metrics: OrderedCategory::new(super::metrics::METRICS_EVENT_NS, handle),
            entity_change: OrderedCategory::new(super::entity::ENTITY_CHANGE_EVENT_NS, handle),
            api_session: ConcurrentCategory::new(super::session::API_SESSION_EVENT_NS, handle),
            sdk: ConcurrentCategory::new(super::session::SDK_EVENT_NS, handle),
            connect: ConcurrentCategory::new(super::connect::CONNECT_EVENT_NS, handle),
        }
    }

    category_api!(
        add_cluster_event_handler,
        remove_cluster_event_handler,
        accept_cluster_event,
        cluster,
        ClusterEvent
    );
    category_api!(
        add_router_event_handler,
        remove_router_event_handler,
        accept_router_event,
        router,
        RouterEvent
    );
    category_api!(
        add_service_event_handler,
        remove_service_event_handler,
        accept_service_event,
        service,
        ServiceEvent
    );
    category_api!(
        add_terminator_event_handler,
        remove_terminator_event_handler,
        accept_terminator_event,
        terminator,
        TerminatorEvent
    );
    category_api!(
        add_circuit_event_handler,
        remove_circuit_event_handler,
        accept_circuit_event,
        circuit,
        CircuitEvent
    );
    category_api!(
        add_link_event_handler,
        remove_link_event_handler,
        accept_link_event,
        link,
        LinkEvent
    );
    category_api!(
        add_usage_event_handler,
        remove_usage_event_handler,
        accept_usage_event,
        usage,
        UsageEvent
    );
    category_api!(
        add_usage_event_v3_handler,
        remove_usage_event_v3_handler,
        accept_usage_event_v3,
        usage_v3,
        UsageEventV3
    );
    category_api!(
        add_metrics_event_handler,
        remove_metrics_event_handler,
        accept_metrics_event,
        metrics,
        MetricsEvent
    );
    category_api!(
        add_entity_change_event_handler,
        remove_entity_change_event_handler,
        accept_entity_change_event,
        entity_change,
        EntityChangeEvent
    );
    category_api!(
        add_api_session_event_handler,
        remove_api_session_event_handler,
        accept_api_session_event,
        api_session,
        ApiSessionEvent
    );
    category_api!(
        add_sdk_event_handler,
        remove_sdk_event_handler,
        accept_sdk_event,
        sdk,
        SdkEvent
    );
    category_api!(
        add_connect_event_handler,
        remove_connect_event_handler,
        accept_connect_event,
        connect,
        ConnectEvent
    );

    subtype_registration!(
        register_cluster_event_handler,
        unregister_cluster_event_handler,
        cluster,
        ClusterEvent,
        cluster_event_handler,
        "ClusterEventHandler",
        CLUSTER_EVENT_TYPES
    );
    subtype_registration!(
        register_router_event_handler,
        unregister_router_event_handler,
        router,
        RouterEvent,
        router_event_handler,
        "RouterEventHandler",
        ROUTER_EVENT_TYPES
    );
    subtype_registration!(
        register_service_event_handler,
        unregister_service_event_handler,
        service,
        ServiceEvent,
        service_event_handler,
        "ServiceEventHandler",
        SERVICE_EVENT_TYPES
    );
    subtype_registration!(
        register_circuit_event_handler,
        unregister_circuit_event_handler,
        circuit,
        CircuitEvent,
        circuit_event_handler,
        "CircuitEventHandler",
        CIRCUIT_EVENT_TYPES
    );
    subtype_registration!(
        register_link_event_handler,
        unregister_link_event_handler,
        link,
        LinkEvent,
        link_event_handler,
        "LinkEventHandler",
        LINK_EVENT_TYPES
    );
    subtype_registration!(
        register_api_session_event_handler,
        unregister_api_session_event_handler,
        api_session,
        ApiSessionEvent,
        api_session_event_handler,
        "ApiSessionEventHandler",
        API_SESSION_EVENT_TYPES
    );
    subtype_registration!(
        register_sdk_event_handler,
        unregister_sdk_event_handler,
        sdk,
        SdkEvent,
        sdk_event_handler,
        "SdkEventHandler",
        SDK_EVENT_TYPES
    );
    subtype_registration!(
        register_connect_event_handler,
        unregister_connect_event_handler,
        connect,
        ConnectEvent,
        connect_event_handler,
        "ConnectEventHandler",
        CONNECT_EVENT_TYPES
    );
    subtype_registration!(
        register_entity_change_event_handler,
        unregister_entity_change_event_handler,
        entity_change,
        EntityChangeEvent,
        entity_change_event_handler,
        "EntityChangeEventHandler",
        ENTITY_CHANGE_EVENT_TYPES
    );

    /// Register `value` on the terminator category.
    ///
    /// Unless `propagateAlways` is set, the handler is wrapped so model-only
    /// events (propagate indicator clear) are suppressed. An `include` option
    /// further restricts delivered subtypes.
    pub fn register_terminator_event_handler(
        &self,
        value: &Arc<dyn HandlerCapabilities>,
        config: &HandlerConfig,
    ) -> Result<(), RegistrationError> {
        let handler = value.clone().terminator_event_handler().ok_or(
            RegistrationError::CapabilityMismatch {
                required: "TerminatorEventHandler",
            },
        )?;

        let mut handler = handler;
        if !parse_propagate_always(config)? {
            handler = Arc::new(PropagationFilter::new(handler));
        }
        if let Some(include) = parse_include(config)? {
            validate_include(&include, TERMINATOR_EVENT_TYPES)?;
            handler = Arc::new(IncludeFilter::new(handler, include));
        }

        self.terminator.add(handler);
        Ok(())
    }

    /// Unregister `value` from the terminator category.
    pub fn unregister_terminator_event_handler(&self, value: &Arc<dyn HandlerCapabilities>) {
        if let Some(handler) = value.clone().terminator_event_handler() {
            self.terminator.remove(&handler);
        }
    }

    /// Register `value` on the metrics category.
    ///
    /// An `include` option restricts which metric keys reach the handler; the
    /// key space is open-ended, so values are not validated against an
    /// enumeration.
    pub fn register_metrics_event_handler(
        &self,
        value: &Arc<dyn HandlerCapabilities>,
        config: &HandlerConfig,
    ) -> Result<(), RegistrationError> {
        let handler = value.clone().metrics_event_handler().ok_or(
            RegistrationError::CapabilityMismatch {
                required: "MetricsEventHandler",
            },
        )?;
        let handler = match parse_include(config)? {
            Some(include) => Arc::new(MetricsKeyFilter::new(handler, include))
                as Arc<dyn EventHandler<MetricsEvent>>,
            None => handler,
        };
        self.metrics.add(handler);
        Ok(())
    }

    /// Unregister `value` from the metrics category.
    pub fn unregister_metrics_event_handler(&self, value: &Arc<dyn HandlerCapabilities>) {
        if let Some(handler) = value.clone().metrics_event_handler() {
            self.metrics.remove(&handler);
        }
    }

    /// Register `value` on the usage category selected by the `version` option
    /// (2, the default, or 3).
    ///
    /// For version 2 the `include` option restricts delivered subtypes. For
    /// version 3 it restricts the usage keys inside each event.
    pub fn register_usage_event_handler(
        &self,
        value: &Arc<dyn HandlerCapabilities>,
        config: &HandlerConfig,
    ) -> Result<(), RegistrationError> {
        match parse_usage_version(config)? {
            2 => {
                let handler = value.clone().usage_event_handler().ok_or(
                    RegistrationError::CapabilityMismatch {
                        required: "UsageEventHandler",
                    },
                )?;
                let handler = match parse_include(config)? {
                    Some(include) => {
                        validate_include(&include, USAGE_EVENT_TYPES)?;
                        Arc::new(IncludeFilter::new(handler, include))
                            as Arc<dyn EventHandler<UsageEvent>>
                    }
                    None => handler,
                };
                self.usage.add(handler);
            }
            3 => {
                let handler = value.clone().usage_event_v3_handler().ok_or(
                    RegistrationError::CapabilityMismatch {
                        required: "UsageEventV3Handler",
                    },
                )?;
                let handler = match parse_include(config)? {
                    Some(include) => Arc::new(UsageKeyFilter::new(handler, include))
                        as Arc<dyn EventHandler<UsageEventV3>>,
                    None => handler,
                };
                self.usage_v3.add(handler);
            }
            other => return Err(RegistrationError::UnsupportedVersion { version: other }),
        }
        Ok(())
    }

    /// Unregister `value` from both usage categories.
    ///
    /// The schema version used at registration is not required here; removal
    /// is attempted against both lists.
    pub fn unregister_usage_event_handler(&self, value: &Arc<dyn HandlerCapabilities>) {
        if let Some(handler) = value.clone().usage_event_handler() {
            self.usage.remove(&handler);
        }
        if let Some(handler) = value.clone().usage_event_v3_handler() {
            self.usage_v3.remove(&handler);
        }
    }
}
