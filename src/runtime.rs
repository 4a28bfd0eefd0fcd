//! Runtime separation for the control plane and the event plane.
//!
//! A controller process runs two tokio runtimes:
//! - **Control plane**: consensus submissions, membership changes, handshakes
//! - **Event plane**: dispatcher fan-out to registered event handlers
//!
//! Separating these keeps a flood of event deliveries (or a badly behaved
//! handler) from starving membership operations, which could delay read-only
//! transitions and leadership notifications.
//!
//! [`EventDispatcher::with_handles`](crate::events::EventDispatcher::with_handles)
//! is the production wiring: it pins the dispatcher's fan-out tasks to the
//! event plane.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fabricmesh::events::EventDispatcher;
//! use fabricmesh::mesh::{Mesh, MeshConfig};
//! use fabricmesh::runtime::{ControllerRuntimes, RuntimeConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtimes = ControllerRuntimes::new(RuntimeConfig::from_env())?;
//!     let dispatcher = Arc::new(EventDispatcher::with_handles(&runtimes.handles()));
//!     let mesh = Mesh::builder(MeshConfig::from_env())
//!         .dispatcher(dispatcher.clone())
//!         .build();
//!
//!     runtimes.block_on_control(async {
//!         // ... wire transports and serve admin commands against `mesh`
//!         let _ = mesh.is_read_only();
//!     });
//!
//!     runtimes.shutdown(Duration::from_secs(5));
//!     Ok(())
//! }
//! ```

use std::io;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// Thread name prefix for control plane workers.
const CONTROL_THREAD_NAME: &str = "mesh-ctrl";

/// Thread name prefix for event plane workers.
const EVENT_THREAD_NAME: &str = "mesh-events";

/// Configuration for the dual-runtime setup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads for the control plane.
    ///
    /// Control plane work is low-throughput but latency-sensitive.
    ///
    /// Default: 2
    pub control_plane_threads: usize,

    /// Number of worker threads for the event plane.
    ///
    /// Event fan-out is throughput-bound and tolerant of queueing.
    ///
    /// Default: number of CPU cores
    pub event_plane_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            control_plane_threads: 2,
            event_plane_threads: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4),
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// - `CONTROL_PLANE_THREADS`: control plane worker threads (default: 2)
    /// - `EVENT_PLANE_THREADS`: event plane worker threads (default: num_cpus)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let control_plane_threads = std::env::var("CONTROL_PLANE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.control_plane_threads);

        let event_plane_threads = std::env::var("EVENT_PLANE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.event_plane_threads);

        Self {
            control_plane_threads,
            event_plane_threads,
        }
    }
}

fn build_runtime(worker_threads: usize, thread_name: &str) -> io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name(thread_name)
        .enable_all()
        .build()
}

/// Handles for both runtimes, enabling task spawning on the correct plane.
///
/// Cheap to clone; pass to components that need to spawn tasks. The event
/// handle is what
/// [`EventDispatcher::with_handles`](crate::events::EventDispatcher::with_handles)
/// spawns fan-out tasks on.
#[derive(Clone)]
pub struct RuntimeHandles {
    /// Control plane runtime handle for membership and consensus tasks.
    pub control: Handle,

    /// Event plane runtime handle for dispatcher fan-out.
    pub events: Handle,
}

impl RuntimeHandles {
    /// Create handles from the current runtime.
    ///
    /// Both handles point at the current tokio runtime. Useful for tests or
    /// when runtime separation is not desired.
    pub fn from_current() -> Self {
        let current = Handle::current();
        Self {
            control: current.clone(),
            events: current,
        }
    }
}

/// Owned runtimes for a controller process.
///
/// Held by the main entry point; use [`handles`](Self::handles) for cloneable
/// handles to pass into components.
pub struct ControllerRuntimes {
    control: Runtime,
    events: Runtime,
}

impl ControllerRuntimes {
    /// Create both runtimes with the given configuration.
    pub fn new(config: RuntimeConfig) -> io::Result<Self> {
        Ok(Self {
            control: build_runtime(config.control_plane_threads, CONTROL_THREAD_NAME)?,
            events: build_runtime(config.event_plane_threads, EVENT_THREAD_NAME)?,
        })
    }

    /// Get cloneable handles for spawning tasks on each plane.
    pub fn handles(&self) -> RuntimeHandles {
        RuntimeHandles {
            control: self.control.handle().clone(),
            events: self.events.handle().clone(),
        }
    }

    /// Block on a future using the control plane runtime.
    ///
    /// Typically used in main() to run the controller's async entry point.
    pub fn block_on_control<F: std::future::Future>(&self, future: F) -> F::Output {
        self.control.block_on(future)
    }

    /// Gracefully shut down both planes.
    ///
    /// Stops the control plane first so nothing keeps producing, then gives
    /// the event plane up to `grace` to drain queued deliveries.
    pub fn shutdown(self, grace: Duration) {
        debug!("shutting down controller runtimes");
        self.control.shutdown_background();
        self.events.shutdown_timeout(grace);
    }
}
