//! Minimal service host: one heartbeat task under the platform control plane.
//!
//! On Windows the process must be started by the Service Control Manager;
//! started from a console it exits with the dispatch error code (1063).
//! Elsewhere it runs against a detached simulated control plane and exits the
//! same way. Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;
use std::time::Duration;

use servicevisor::{
    ControlPlane, Dispatcher, HostConfig, LogWriter, ServiceConfig, ServiceSpec, Subscribe,
    TaskError, TaskFn, TaskRef,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "MinimalService";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    std::process::exit(process_status(run()));
}

/// Maps a service exit code onto the process exit status.
///
/// Outside Windows only the low byte survives, so a failure code whose low
/// byte is zero is reported as 1.
fn process_status(code: u32) -> i32 {
    if cfg!(not(windows)) && code != 0 && code & 0xff == 0 {
        return 1;
    }
    code as i32
}

fn run() -> u32 {
    let heartbeat: TaskRef = TaskFn::arc("heartbeat", |ctx: CancellationToken| async move {
        let mut beats = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(3)) => {
                    beats += 1;
                    tracing::debug!(beats, "heartbeat");
                }
            }
        }
        Ok::<(), TaskError>(())
    });

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let built = Dispatcher::builder(control_plane(), HostConfig::default())
        .with_subscribers(subs)
        .service(ServiceSpec::new(ServiceConfig::new(SERVICE_NAME), heartbeat))
        .build();

    let dispatcher = match built {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, label = e.as_label(), "cannot build dispatcher");
            return e.exit_code();
        }
    };

    match dispatcher.run() {
        Ok(report) => report.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, label = e.as_label(), "dispatch failed");
            e.exit_code()
        }
    }
}

#[cfg(windows)]
fn control_plane() -> Arc<dyn ControlPlane> {
    Arc::new(servicevisor::WindowsControlPlane::new())
}

#[cfg(not(windows))]
fn control_plane() -> Arc<dyn ControlPlane> {
    Arc::new(servicevisor::SimulatedControlPlane::detached())
}
