//! # Service entry point.
//!
//! [`ServiceMain::run`] is what the control plane invokes on the service's own
//! thread. One invocation is one run:
//!
//! ```text
//! register(handler) ──✗──► RegistrationFailed, exit 1
//!        │
//! create_stop_signal ──✗──► SignalCreationFailed, exit 2
//!        │
//! report StartPending ──► spawn task ──► report Running
//!        │
//! wait(stop signal)          ◄── handler: StopPending + set
//!        │
//! report Stopped ──► release handle ──► exit 0
//! ```
//!
//! Status reports that fail or are rejected do not end the run. A stop that
//! lands during StartPending makes the Running report a rejected regression,
//! and the wait returns at once. A stop handled before the stop signal is
//! installed skips the start: the run reports StopPending (unless the handler
//! already did), never spawns the task, and goes straight to Stopped.
//!
//! A panic is caught at the boundary: the run still reports Stopped (with
//! exit code 1066 and service-specific code [`EXIT_SERVICE_PANICKED`]) when it
//! had registered, and the entry point returns [`EXIT_SERVICE_PANICKED`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::context::ServiceContext;
use super::runner;
use crate::config::ServiceConfig;
use crate::control::ControlHandler;
use crate::error::{EXIT_SERVICE_PANICKED, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::plane::ControlPlane;
use crate::status::{ERROR_SERVICE_SPECIFIC_ERROR, ServiceState};
use crate::subscribers::panic_message;
use crate::tasks::TaskRef;

/// Entry-point body of one service.
#[derive(Clone)]
pub struct ServiceMain {
    plane: Arc<dyn ControlPlane>,
    config: ServiceConfig,
    task: TaskRef,
    bus: Bus,
    runtime: Handle,
}

impl ServiceMain {
    /// `runtime` is where the task is spawned; the entry point itself stays synchronous.
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        config: ServiceConfig,
        task: TaskRef,
        bus: Bus,
        runtime: Handle,
    ) -> Self {
        Self {
            plane,
            config,
            task,
            bus,
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs the service to completion and returns its exit code.
    ///
    /// Blocks the calling thread; must not be called from inside the async runtime.
    pub fn run(&self) -> u32 {
        let ctx = ServiceContext::new(&self.config, Arc::clone(&self.plane), self.bus.clone());

        let mut exited = Event::new(EventKind::ServiceExited);
        let code = match catch_unwind(AssertUnwindSafe(|| self.lifecycle(&ctx))) {
            Ok(code) => code,
            Err(panic) => {
                exited = exited.with_reason(format!("panicked: {}", panic_message(&*panic)));
                self.stop_after_panic(&ctx);
                EXIT_SERVICE_PANICKED
            }
        };

        if let Some(handle) = ctx.status().handle() {
            self.plane.release(handle);
        }
        ctx.publish(exited.with_exit_code(code));
        code
    }

    fn lifecycle(&self, ctx: &Arc<ServiceContext>) -> u32 {
        let handler = ControlHandler::new(Arc::clone(ctx));
        let handle = match self.plane.register(ctx.name(), handler.into_callback()) {
            Ok(handle) => handle,
            Err(source) => {
                let err = ServiceError::RegistrationFailed {
                    service: ctx.name().to_string(),
                    source,
                };
                return self.fail(ctx, EventKind::RegistrationFailed, &err);
            }
        };
        ctx.attach(handle);

        let signal = match self.plane.create_stop_signal() {
            Ok(signal) => signal,
            Err(source) => {
                let err = ServiceError::SignalCreationFailed {
                    service: ctx.name().to_string(),
                    source,
                };
                return self.fail(ctx, EventKind::SignalCreationFailed, &err);
            }
        };
        let signal = ctx.install_stop(signal);

        // Outcomes are published by the context; none of them ends the run.
        if ctx.stop_requested() {
            // The handler ran before the handle was attached and could not report.
            if ctx.status().state() != ServiceState::StopPending {
                let _ = ctx.report(ServiceState::StopPending);
            }
        } else {
            let _ = ctx.report(ServiceState::StartPending);
            runner::spawn(
                &self.runtime,
                Arc::clone(ctx),
                Arc::clone(&self.task),
                signal.child_token(),
            );
            let _ = ctx.report(ServiceState::Running);
        }

        signal.wait();

        let _ = ctx.report(ServiceState::Stopped);
        0
    }

    fn fail(&self, ctx: &ServiceContext, kind: EventKind, err: &ServiceError) -> u32 {
        ctx.publish(
            Event::new(kind)
                .with_exit_code(err.exit_code())
                .with_reason(err.to_string()),
        );
        err.exit_code()
    }

    fn stop_after_panic(&self, ctx: &ServiceContext) {
        if ctx.status().handle().is_none() {
            return;
        }
        let _ = ctx
            .status()
            .set_exit_code(ERROR_SERVICE_SPECIFIC_ERROR, EXIT_SERVICE_PANICKED);
        let _ = ctx.report(ServiceState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlCode;
    use crate::error::{EXIT_REGISTRATION_FAILED, EXIT_SIGNAL_CREATION_FAILED, TaskError};
    use crate::plane::SimulatedControlPlane;
    use crate::tasks::TaskFn;
    use std::thread;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const SETTLE: Duration = Duration::from_secs(5);

    fn idle_task() -> TaskRef {
        TaskFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<(), TaskError>(())
        })
    }

    fn service(sim: &SimulatedControlPlane, rt: &tokio::runtime::Runtime) -> ServiceMain {
        ServiceMain::new(
            Arc::new(sim.clone()),
            ServiceConfig::new("svc"),
            idle_task(),
            Bus::new(64),
            rt.handle().clone(),
        )
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime")
    }

    #[test]
    fn registration_failure_reports_nothing() {
        let rt = runtime();
        let sim = SimulatedControlPlane::new();
        sim.fail_registration();

        assert_eq!(service(&sim, &rt).run(), EXIT_REGISTRATION_FAILED);
        assert!(sim.pushes().is_empty());
    }

    #[test]
    fn signal_failure_reports_nothing() {
        let rt = runtime();
        let sim = SimulatedControlPlane::new();
        sim.fail_signal_creation();

        assert_eq!(service(&sim, &rt).run(), EXIT_SIGNAL_CREATION_FAILED);
        assert!(sim.pushes().is_empty());
    }

    #[test]
    fn stop_ends_the_run() {
        let rt = runtime();
        let sim = SimulatedControlPlane::new();
        let svc = service(&sim, &rt);
        let worker = thread::spawn(move || svc.run());

        assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
        sim.deliver("svc", ControlCode::Stop);
        assert_eq!(worker.join().expect("entry thread"), 0);

        use ServiceState::*;
        assert_eq!(sim.states("svc"), vec![StartPending, Running, StopPending, Stopped]);
        assert_eq!(sim.deliver("svc", ControlCode::Stop), None);
    }

    #[test]
    fn panicking_task_does_not_take_the_run_down() {
        let rt = runtime();
        let sim = SimulatedControlPlane::new();
        let task: TaskRef = TaskFn::arc("bad", |_ctx: CancellationToken| async move {
            if true {
                panic!("bad task");
            }
            Ok::<(), TaskError>(())
        });
        let svc = ServiceMain::new(
            Arc::new(sim.clone()),
            ServiceConfig::new("svc"),
            task,
            Bus::new(64),
            rt.handle().clone(),
        );
        let worker = thread::spawn(move || svc.run());

        assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
        sim.deliver("svc", ControlCode::Shutdown);
        assert_eq!(worker.join().expect("entry thread"), 0);
    }
}
