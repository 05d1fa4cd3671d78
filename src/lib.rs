//! # servicevisor
//!
//! **Servicevisor** runs a long-lived async task as an operating-system
//! service: it registers with the service control plane, reports the
//! StartPending → Running → StopPending → Stopped lifecycle, and turns a
//! Stop or Shutdown request into a graceful exit.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!  main thread ──────►│ Dispatcher                                   │
//!                     │  - host tokio runtime                        │
//!                     │  - Bus ──► forwarder ──► SubscriberSet       │
//!                     │  - DispatchTable [(name, ServiceMain)]       │
//!                     └──────────────────────┬───────────────────────┘
//!                                            │ ControlPlane::dispatch (blocks)
//!                                            ▼
//!   ┌────────────────────────────────────────────────────────────────────┐
//!   │ ControlPlane  (WindowsControlPlane │ SimulatedControlPlane)        │
//!   └──────┬─────────────────────────────────────────────┬──────────────┘
//!          │ entry-point thread                          │ handler thread(s)
//!          ▼                                             ▼
//!   ┌──────────────┐      shared Arc<ServiceContext>   ┌────────────────┐
//!   │ ServiceMain  │◄────────────────────────────────►│ ControlHandler │
//!   │  register    │   StatusBlock (mutex + push)      │  Stop/Shutdown │
//!   │  report      │   StopSignal (manual reset)       │  → StopPending │
//!   │  wait ◄──────┼───────────────────── set ◄────────┤  → set signal  │
//!   │  Stopped     │                                   └────────────────┘
//!   └──────┬───────┘
//!          │ spawn (fire-and-forget)
//!          ▼
//!   Task::run(child token)  on the host runtime
//! ```
//!
//! ### Lifecycle of one run
//! ```text
//! register ─✗─► exit 1
//! create stop signal ─✗─► exit 2
//! report StartPending (checkpoint 1, wait hint)
//! spawn task
//! report Running (accepts Stop | Shutdown)
//! wait for the stop signal        ◄── Stop/Shutdown: report StopPending, set signal
//! report Stopped ─► exit 0
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                            |
//! |-------------------|-----------------------------------------------------------|-----------------------------------------------|
//! | **Bootstrap**     | Build the dispatch table and block in dispatch.           | [`Dispatcher`], [`ServiceSpec`]               |
//! | **Status**        | Forward-only, lock-guarded status reporting.              | [`StatusBlock`], [`ServiceStatus`]            |
//! | **Control**       | Stop/Shutdown handling, everything else refused.          | [`ControlHandler`], [`ControlCode`]           |
//! | **Control plane** | OS boundary as a trait, with an in-process backend.       | [`ControlPlane`], [`SimulatedControlPlane`]   |
//! | **Tasks**         | The hosted async work.                                    | [`Task`], [`TaskFn`], [`TaskRef`]             |
//! | **Events**        | Lifecycle events fanned out to subscribers.               | [`Event`], [`Subscribe`], [`LogWriter`]       |
//! | **Errors**        | Typed errors with stable labels and exit codes.           | [`ServiceError`], [`StatusError`], [`TaskError`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use servicevisor::{
//!     ControlCode, Dispatcher, HostConfig, ServiceConfig, ServiceSpec, ServiceState,
//!     SimulatedControlPlane, TaskError, TaskFn, TaskRef,
//! };
//!
//! let plane = SimulatedControlPlane::new();
//! let task: TaskRef = TaskFn::arc("idle", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<(), TaskError>(())
//! });
//!
//! let dispatcher = Dispatcher::builder(Arc::new(plane.clone()), HostConfig::default())
//!     .service(ServiceSpec::new(ServiceConfig::new("demo"), task))
//!     .build()
//!     .expect("build");
//!
//! // Play the control plane: stop the service once it is running.
//! let scm = thread::spawn(move || {
//!     assert!(plane.wait_for_state("demo", ServiceState::Running, Duration::from_secs(5)));
//!     plane.deliver("demo", ControlCode::Stop);
//! });
//!
//! let report = dispatcher.run().expect("dispatch");
//! scm.join().unwrap();
//! assert_eq!(report.exit_code(), 0);
//! ```
mod config;
mod control;
mod dispatcher;
mod error;
mod events;
mod plane;
mod service;
mod signal;
mod status;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{HostConfig, ServiceConfig};
pub use control::{ControlCode, ControlHandler, ControlResult, ERROR_CALL_NOT_IMPLEMENTED};
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherBuilder, ServiceSpec};
pub use error::{
    EXIT_DISPATCH_FAILED, EXIT_REGISTRATION_FAILED, EXIT_SERVICE_PANICKED,
    EXIT_SIGNAL_CREATION_FAILED, PlaneError, ServiceError, StatusError, TaskError,
};
pub use events::{Bus, Event, EventKind};
pub use plane::{
    ControlCallback, ControlPlane, DispatchEntry, DispatchTable, ERROR_FAILED_SERVICE_CONTROLLER_CONNECT,
    EntryPoint, ServiceExit, ServiceHandle, SimulatedControlPlane, StatusPush,
};
pub use service::{ServiceContext, ServiceMain};
pub use signal::StopSignal;
pub use status::{
    ControlsAccepted, ERROR_SERVICE_SPECIFIC_ERROR, RawServiceStatus, ServiceState, ServiceStatus,
    ServiceType, StatusBlock,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef};

#[cfg(windows)]
pub use plane::WindowsControlPlane;
