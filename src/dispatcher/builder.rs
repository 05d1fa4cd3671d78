use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use super::host::Dispatcher;
use crate::config::{HostConfig, ServiceConfig};
use crate::error::ServiceError;
use crate::events::Bus;
use crate::plane::{ControlPlane, DispatchEntry, DispatchTable};
use crate::service::ServiceMain;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::TaskRef;

/// One service of the dispatch table: its configuration and the task it hosts.
#[derive(Clone)]
pub struct ServiceSpec {
    pub config: ServiceConfig,
    pub task: TaskRef,
}

impl ServiceSpec {
    pub fn new(config: ServiceConfig, task: TaskRef) -> Self {
        Self { config, task }
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    plane: Arc<dyn ControlPlane>,
    host: HostConfig,
    services: Vec<ServiceSpec>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl DispatcherBuilder {
    pub(super) fn new(plane: Arc<dyn ControlPlane>, host: HostConfig) -> Self {
        Self {
            plane,
            host,
            services: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a service to the dispatch table. Order is preserved.
    pub fn service(mut self, spec: ServiceSpec) -> Self {
        self.services.push(spec);
        self
    }

    /// Builds the dispatcher.
    ///
    /// Creates the host runtime, the event bus, the subscriber workers and the
    /// dispatch table. Must be called outside of any async runtime.
    pub fn build(self) -> Result<Dispatcher, ServiceError> {
        let runtime = host_runtime(&self.host)?;
        let bus = Bus::new(self.host.bus_capacity);

        let entries = self
            .services
            .into_iter()
            .map(|spec| {
                let main = ServiceMain::new(
                    Arc::clone(&self.plane),
                    spec.config,
                    spec.task,
                    bus.clone(),
                    runtime.handle().clone(),
                );
                let name = main.name().to_string();
                DispatchEntry::new(name, Arc::new(move || main.run()))
            })
            .collect();
        let table = DispatchTable::new(entries)?;

        let subs = SubscriberSet::new(self.subscribers, bus.clone(), runtime.handle());
        Ok(Dispatcher::new(
            self.plane,
            table,
            bus,
            subs,
            runtime,
            self.host.grace,
        ))
    }
}

fn host_runtime(host: &HostConfig) -> Result<Runtime, ServiceError> {
    let mut builder = Builder::new_multi_thread();
    if host.worker_threads > 0 {
        builder.worker_threads(host.worker_threads);
    }
    builder
        .thread_name("servicevisor-rt")
        .enable_all()
        .build()
        .map_err(|source| ServiceError::Runtime { source })
}
