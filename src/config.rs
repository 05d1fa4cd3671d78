//! # Host and per-service configuration.
//!
//! [`HostConfig`] shapes the process around the dispatch loop: the async runtime
//! the hosted tasks run on, the event bus, and how long teardown may take.
//! [`ServiceConfig`] describes one entry of the dispatch table.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use servicevisor::{HostConfig, ServiceConfig, ServiceType};
//!
//! let mut host = HostConfig::default();
//! host.grace = Duration::from_secs(5);
//! host.worker_threads = 1;
//!
//! let mut svc = ServiceConfig::new("MinimalService");
//! svc.service_type = ServiceType::OwnProcess;
//! svc.wait_hint = Duration::from_secs(2);
//!
//! assert_eq!(svc.name, "MinimalService");
//! ```

use std::time::Duration;

use crate::status::ServiceType;

/// Process-wide configuration for the dispatcher.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Maximum time to wait for subscribers and tasks after dispatch returns.
    pub grace: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Worker threads of the host runtime (0 = tokio default).
    pub worker_threads: usize,
}

impl Default for HostConfig {
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `worker_threads = 2`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            worker_threads: 2,
        }
    }
}

/// Configuration of one hosted service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Name the service is registered under. Must be non-empty and unique in the table.
    pub name: String,
    /// Service type carried in every status record.
    pub service_type: ServiceType,
    /// Wait hint sent with pending states.
    pub wait_hint: Duration,
}

impl ServiceConfig {
    /// Own-process service with a 5s wait hint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_type: ServiceType::OwnProcess,
            wait_hint: Duration::from_secs(5),
        }
    }
}
