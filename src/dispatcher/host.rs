//! # Dispatcher: owns the host runtime and blocks in the control plane's dispatch.
//!
//! Event flow while dispatching:
//!
//! ```text
//! entry points / handlers ──► Bus ──► forwarder (host runtime) ──► SubscriberSet
//! ```
//!
//! ## Teardown, after dispatch returns
//! 1. the forwarder drains what is still buffered and shuts the subscriber workers down
//! 2. the host runtime is shut down; tasks still running after `grace` are abandoned

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::DispatcherBuilder;
use crate::config::HostConfig;
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::plane::{ControlPlane, DispatchTable, ServiceExit};
use crate::subscribers::SubscriberSet;

/// Result of a completed dispatch: one exit per service, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub services: Vec<ServiceExit>,
}

impl DispatchReport {
    /// Process exit code: the first non-zero service exit code, else 0.
    pub fn exit_code(&self) -> u32 {
        self.services
            .iter()
            .map(|s| s.exit_code)
            .find(|&c| c != 0)
            .unwrap_or(0)
    }
}

/// Hosts one or more services under a control plane.
pub struct Dispatcher {
    plane: Arc<dyn ControlPlane>,
    table: DispatchTable,
    bus: Bus,
    runtime: Runtime,
    forwarder: JoinHandle<()>,
    closing: CancellationToken,
    grace: Duration,
}

impl Dispatcher {
    /// Starts building a dispatcher for `plane`.
    pub fn builder(plane: Arc<dyn ControlPlane>, host: HostConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(plane, host)
    }

    pub(super) fn new(
        plane: Arc<dyn ControlPlane>,
        table: DispatchTable,
        bus: Bus,
        subs: SubscriberSet,
        runtime: Runtime,
        grace: Duration,
    ) -> Self {
        let closing = CancellationToken::new();
        let forwarder = forward_events(&runtime, &bus, subs, closing.clone());
        Self {
            plane,
            table,
            bus,
            runtime,
            forwarder,
            closing,
            grace,
        }
    }

    /// Event bus shared by every service of this dispatcher.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Names in the dispatch table, in order.
    pub fn services(&self) -> Vec<&str> {
        self.table.names()
    }

    /// Enters the control plane's dispatch loop and blocks until every service returned.
    ///
    /// A dispatch failure starts no service thread and returns
    /// [`ServiceError::DispatchFailed`].
    pub fn run(self) -> Result<DispatchReport, ServiceError> {
        self.bus.publish(
            Event::new(EventKind::DispatchStarted).with_reason(self.table.names().join(",")),
        );

        let res = match self.plane.dispatch(&self.table) {
            Ok(services) => {
                let report = DispatchReport { services };
                self.bus.publish(
                    Event::new(EventKind::DispatchFinished).with_exit_code(report.exit_code()),
                );
                Ok(report)
            }
            Err(source) => {
                let err = ServiceError::DispatchFailed { source };
                self.bus.publish(
                    Event::new(EventKind::DispatchFailed)
                        .with_exit_code(err.exit_code())
                        .with_reason(err.to_string()),
                );
                Err(err)
            }
        };

        self.teardown();
        res
    }

    fn teardown(self) {
        let Self {
            runtime,
            forwarder,
            closing,
            grace,
            ..
        } = self;

        closing.cancel();
        let _ = runtime.block_on(async { tokio::time::timeout(grace, forwarder).await });
        runtime.shutdown_timeout(grace);
    }
}

/// Forwards bus events to the subscriber set until `closing`, then drains and shuts it down.
fn forward_events(
    runtime: &Runtime,
    bus: &Bus,
    set: SubscriberSet,
    closing: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    runtime.spawn(async move {
        loop {
            tokio::select! {
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => set.emit(
                        &Event::new(EventKind::SubscriberOverflow)
                            .with_reason(format!("event forwarder lagged by {n} events")),
                    ),
                    Err(RecvError::Closed) => break,
                },
                _ = closing.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(&ev),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit(service: &str, exit_code: u32) -> ServiceExit {
        ServiceExit {
            service: service.into(),
            exit_code,
        }
    }

    #[test]
    fn report_exit_code_is_first_failure() {
        let ok = DispatchReport {
            services: vec![exit("a", 0), exit("b", 0)],
        };
        assert_eq!(ok.exit_code(), 0);

        let failed = DispatchReport {
            services: vec![exit("a", 0), exit("b", 2), exit("c", 1)],
        };
        assert_eq!(failed.exit_code(), 2);
    }
}
