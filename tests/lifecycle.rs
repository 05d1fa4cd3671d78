use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use servicevisor::{
    ControlCallback, ControlCode, ControlPlane, ControlResult, DispatchReport, DispatchTable,
    Dispatcher, ERROR_CALL_NOT_IMPLEMENTED, ERROR_FAILED_SERVICE_CONTROLLER_CONNECT,
    ERROR_SERVICE_SPECIFIC_ERROR, Event, EventKind, HostConfig, PlaneError, ServiceConfig,
    ServiceError, ServiceExit, ServiceHandle, ServiceSpec, ServiceState, ServiceStatus,
    SimulatedControlPlane, StopSignal, Subscribe, TaskError, TaskFn, TaskRef,
};

const SETTLE: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.events.lock().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

struct Hosted {
    dispatch: JoinHandle<Result<DispatchReport, ServiceError>>,
    recorder: Arc<Recorder>,
    events: broadcast::Receiver<Event>,
}

impl Hosted {
    fn finish(self) -> (Result<DispatchReport, ServiceError>, Arc<Recorder>) {
        let res = self.dispatch.join().expect("dispatcher thread");
        (res, self.recorder)
    }

    /// Blocks until an event of `kind` is published.
    fn wait_event(&mut self, kind: EventKind) -> Event {
        loop {
            match self.events.blocking_recv() {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed before {kind:?}"),
            }
        }
    }
}

fn idle_task() -> TaskRef {
    TaskFn::arc("idle", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<(), TaskError>(())
    })
}

fn start(plane: Arc<dyn ControlPlane>, services: Vec<(&str, TaskRef)>) -> Hosted {
    let recorder = Arc::new(Recorder::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];

    let mut builder = Dispatcher::builder(plane, HostConfig::default()).with_subscribers(subs);
    for (name, task) in services {
        builder = builder.service(ServiceSpec::new(ServiceConfig::new(name), task));
    }
    let dispatcher = builder.build().expect("build");
    let events = dispatcher.bus().subscribe();

    Hosted {
        dispatch: thread::spawn(move || dispatcher.run()),
        recorder,
        events,
    }
}

fn start_one(sim: &SimulatedControlPlane, task: TaskRef) -> Hosted {
    start(Arc::new(sim.clone()), vec![("svc", task)])
}

fn exit_codes(report: &DispatchReport) -> Vec<u32> {
    report.services.iter().map(|s| s.exit_code).collect()
}

#[test]
fn stop_while_running_ends_in_stopped() {
    let sim = SimulatedControlPlane::new();
    let run = start_one(&sim, idle_task());

    assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
    assert_eq!(sim.deliver("svc", ControlCode::Stop), Some(ControlResult::Handled));

    let (res, rec) = run.finish();
    let report = res.expect("dispatch");
    assert_eq!(exit_codes(&report), vec![0]);
    assert_eq!(report.exit_code(), 0);

    use ServiceState::*;
    assert_eq!(sim.states("svc"), vec![StartPending, Running, StopPending, Stopped]);
    assert_eq!(rec.count(EventKind::TaskStarting), 1);
    assert_eq!(rec.count(EventKind::StopSignalled), 1);
    assert_eq!(rec.kinds().first(), Some(&EventKind::DispatchStarted));
    assert_eq!(rec.count(EventKind::DispatchFinished), 1);
}

#[test]
fn registration_failure_exits_one_without_reports() {
    let sim = SimulatedControlPlane::new();
    sim.fail_registration();

    let (res, rec) = start_one(&sim, idle_task()).finish();
    assert_eq!(res.expect("dispatch").exit_code(), 1);
    assert!(sim.pushes().is_empty());
    assert_eq!(rec.count(EventKind::RegistrationFailed), 1);
    assert_eq!(rec.count(EventKind::TaskStarting), 0);
}

#[test]
fn signal_creation_failure_exits_two_without_reports() {
    let sim = SimulatedControlPlane::new();
    sim.fail_signal_creation();

    let (res, rec) = start_one(&sim, idle_task()).finish();
    assert_eq!(res.expect("dispatch").exit_code(), 2);
    assert!(sim.pushes().is_empty());
    assert_eq!(rec.count(EventKind::SignalCreationFailed), 1);
}

#[test]
fn back_to_back_stops_wake_the_entry_point_once() {
    let sim = SimulatedControlPlane::new();
    let run = start_one(&sim, idle_task());

    assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
    let first = sim.deliver("svc", ControlCode::Stop);
    let second = sim.deliver("svc", ControlCode::Stop);
    assert_eq!(first, Some(ControlResult::Handled));
    // The second stop may land after the handle was released.
    assert!(matches!(second, Some(ControlResult::Handled) | None));

    let (res, rec) = run.finish();
    assert_eq!(exit_codes(&res.expect("dispatch")), vec![0]);

    let states = sim.states("svc");
    assert_eq!(states.last(), Some(&ServiceState::Stopped));
    assert_eq!(states.iter().filter(|s| **s == ServiceState::Stopped).count(), 1);
    assert_eq!(rec.count(EventKind::StopSignalled), 1);
    assert_eq!(rec.count(EventKind::ServiceExited), 1);
}

#[test]
fn dispatch_outside_control_plane_fails_without_threads() {
    let sim = SimulatedControlPlane::detached();
    let (res, rec) = start_one(&sim, idle_task()).finish();

    let err = res.expect_err("detached dispatch");
    assert_eq!(err.as_label(), "dispatch_failed");
    assert_eq!(err.exit_code(), ERROR_FAILED_SERVICE_CONTROLLER_CONNECT as u32);
    assert_eq!(sim.entry_threads_started(), 0);
    assert!(sim.pushes().is_empty());
    assert_eq!(rec.count(EventKind::DispatchFailed), 1);
    assert_eq!(rec.count(EventKind::TaskStarting), 0);
}

#[test]
fn status_sequence_is_monotonic_and_raw_layout_matches() {
    let sim = SimulatedControlPlane::new();
    let run = start_one(&sim, idle_task());
    assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
    sim.deliver("svc", ControlCode::Shutdown);
    run.finish().0.expect("dispatch");

    let pushes = sim.pushes();
    let ranks: Vec<_> = pushes.iter().map(|p| p.status.current_state.rank()).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));

    let raw: Vec<_> = pushes
        .iter()
        .map(|p| (p.raw.current_state, p.raw.controls_accepted, p.raw.checkpoint))
        .collect();
    assert_eq!(raw, vec![(2, 0, 1), (4, 5, 0), (3, 0, 1), (1, 0, 0)]);
    assert!(pushes.iter().all(|p| p.raw.service_type == 0x10));
}

#[test]
fn unhandled_controls_change_nothing() {
    let sim = SimulatedControlPlane::new();
    let run = start_one(&sim, idle_task());
    assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));

    let before = sim.last_status("svc");
    for code in [ControlCode::Other(0x2), ControlCode::Interrogate, ControlCode::Other(200)] {
        let res = sim.deliver("svc", code).expect("registered");
        assert_eq!(res.raw(), ERROR_CALL_NOT_IMPLEMENTED);
    }
    assert_eq!(sim.last_status("svc"), before);

    sim.deliver("svc", ControlCode::Stop);
    let (res, rec) = run.finish();
    res.expect("dispatch");
    assert_eq!(rec.count(EventKind::ControlRejected), 3);
}

#[test]
fn task_failure_is_carried_by_stopped() {
    let sim = SimulatedControlPlane::new();
    let failing: TaskRef = TaskFn::arc("failing", |_ctx: CancellationToken| async move {
        Err::<(), _>(TaskError::Fail {
            error: "lost upstream".into(),
        })
    });
    let mut run = start_one(&sim, failing);

    let failed = run.wait_event(EventKind::TaskFailed);
    assert_eq!(failed.task.as_deref(), Some("failing"));
    assert!(sim.wait_for_state("svc", ServiceState::Running, SETTLE));
    sim.deliver("svc", ControlCode::Stop);

    let (res, _) = run.finish();
    assert_eq!(exit_codes(&res.expect("dispatch")), vec![0]);
    let stopped = sim.last_status("svc").expect("stopped pushed");
    assert_eq!(stopped.current_state, ServiceState::Stopped);
    assert_eq!(stopped.exit_code, ERROR_SERVICE_SPECIFIC_ERROR);
    assert_eq!(stopped.service_specific_exit_code, 1);
}

#[test]
fn failed_pushes_are_reported_and_the_run_continues() {
    let sim = SimulatedControlPlane::new();
    sim.fail_status_push(true);
    let mut run = start_one(&sim, idle_task());

    loop {
        let ev = run.wait_event(EventKind::StatusPushFailed);
        if ev.state == Some(ServiceState::Running) {
            break;
        }
    }
    assert_eq!(sim.deliver("svc", ControlCode::Stop), Some(ControlResult::Handled));

    let (res, rec) = run.finish();
    assert_eq!(exit_codes(&res.expect("dispatch")), vec![0]);
    assert!(sim.pushes().is_empty());
    assert_eq!(rec.count(EventKind::StatusPushFailed), 4);
    assert_eq!(rec.count(EventKind::StatusReported), 0);
}

/// Where [`EarlyStop`] delivers its stop.
#[derive(Clone, Copy)]
enum StopPoint {
    /// Inside `register`, before the run has attached its handle.
    Registration,
    /// Inside `create_stop_signal`, after the handle is attached.
    SignalCreation,
}

/// Delivers a stop through the registered handler before the run reports anything.
struct EarlyStop {
    inner: SimulatedControlPlane,
    at: StopPoint,
}

impl ControlPlane for EarlyStop {
    fn register(&self, service: &str, handler: ControlCallback) -> Result<ServiceHandle, PlaneError> {
        let handle = self.inner.register(service, Arc::clone(&handler))?;
        if let StopPoint::Registration = self.at {
            assert_eq!(handler(ControlCode::Stop), ControlResult::Handled);
        }
        Ok(handle)
    }

    fn set_status(&self, handle: ServiceHandle, status: &ServiceStatus) -> Result<(), PlaneError> {
        self.inner.set_status(handle, status)
    }

    fn create_stop_signal(&self) -> Result<StopSignal, PlaneError> {
        if let StopPoint::SignalCreation = self.at {
            self.inner.deliver("svc", ControlCode::Stop);
        }
        self.inner.create_stop_signal()
    }

    fn dispatch(&self, table: &DispatchTable) -> Result<Vec<ServiceExit>, PlaneError> {
        self.inner.dispatch(table)
    }

    fn release(&self, handle: ServiceHandle) {
        self.inner.release(handle)
    }
}

fn run_with_early_stop(at: StopPoint) -> (SimulatedControlPlane, Arc<Recorder>) {
    let sim = SimulatedControlPlane::new();
    let plane = EarlyStop {
        inner: sim.clone(),
        at,
    };
    let (res, rec) = start(Arc::new(plane), vec![("svc", idle_task())]).finish();
    assert_eq!(exit_codes(&res.expect("dispatch")), vec![0]);
    (sim, rec)
}

#[test]
fn stop_before_signal_creation_skips_the_start() {
    let (sim, rec) = run_with_early_stop(StopPoint::SignalCreation);

    assert_eq!(
        sim.states("svc"),
        vec![ServiceState::StopPending, ServiceState::Stopped]
    );
    assert_eq!(rec.count(EventKind::StatusRejected), 0);
    assert_eq!(rec.count(EventKind::StopSignalled), 1);
    assert_eq!(rec.count(EventKind::TaskStarting), 0);
}

#[test]
fn stop_before_handle_is_attached_still_reports_stop_pending() {
    let (sim, rec) = run_with_early_stop(StopPoint::Registration);

    // The handler's own StopPending had no handle to go through.
    assert_eq!(rec.count(EventKind::StatusRejected), 1);
    assert_eq!(
        sim.states("svc"),
        vec![ServiceState::StopPending, ServiceState::Stopped]
    );
    assert!(sim
        .pushes()
        .iter()
        .all(|p| p.status.controls_accepted.is_empty()));
    assert_eq!(rec.count(EventKind::StopSignalled), 1);
    assert_eq!(rec.count(EventKind::TaskStarting), 0);
}

#[test]
fn every_service_in_the_table_runs() {
    let sim = SimulatedControlPlane::new();
    let run = start(
        Arc::new(sim.clone()),
        vec![("alpha", idle_task()), ("beta", idle_task())],
    );

    for name in ["alpha", "beta"] {
        assert!(sim.wait_for_state(name, ServiceState::Running, SETTLE));
        sim.deliver(name, ControlCode::Stop);
    }

    let report = run.finish().0.expect("dispatch");
    let names: Vec<_> = report.services.iter().map(|s| s.service.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(sim.entry_threads_started(), 2);
}

#[test]
fn invalid_tables_are_rejected_before_dispatch() {
    let sim = SimulatedControlPlane::new();

    let empty = Dispatcher::builder(Arc::new(sim.clone()), HostConfig::default()).build();
    assert!(matches!(empty, Err(ServiceError::InvalidTable { .. })));

    let dup = Dispatcher::builder(Arc::new(sim.clone()), HostConfig::default())
        .service(ServiceSpec::new(ServiceConfig::new("svc"), idle_task()))
        .service(ServiceSpec::new(ServiceConfig::new("svc"), idle_task()))
        .build();
    assert!(matches!(dup, Err(ServiceError::InvalidTable { .. })));
    assert_eq!(sim.entry_threads_started(), 0);
}
