//! # Dispatcher bootstrap.
//!
//! The process's `main` builds a [`Dispatcher`] and hands its thread to the
//! control plane:
//!
//! ```text
//! Dispatcher::builder(plane, host)
//!     .with_subscribers(..)
//!     .service(ServiceSpec::new(config, task))   (one or more)
//!     .build()?          ─► host runtime, bus, subscriber workers, dispatch table
//!     .run()?            ─► ControlPlane::dispatch (blocks) ─► DispatchReport
//! ```

mod builder;
mod host;

pub use builder::{DispatcherBuilder, ServiceSpec};
pub use host::{DispatchReport, Dispatcher};
