//! # Control handler: the control plane's callback into a run.
//!
//! Invoked on a thread owned by the control plane, possibly concurrently with the
//! entry point and possibly several times.
//!
//! ```text
//! Stop / Shutdown ──► ControlReceived ──► report StopPending ──► set stop signal ──► Handled
//! anything else   ──► ControlRejected ──────────────────────────────────────────► NotHandled
//! ```
//!
//! The status is reported before the signal is set so a control plane polling
//! the status sees StopPending before the entry point gets to report Stopped.
//! A panic inside the handler is caught and answered with `NotHandled`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::code::{ControlCode, ControlResult};
use crate::events::{Event, EventKind};
use crate::plane::ControlCallback;
use crate::service::ServiceContext;
use crate::status::ServiceState;

/// Translates control codes into status reports and stop-signal sets.
#[derive(Clone)]
pub struct ControlHandler {
    ctx: Arc<ServiceContext>,
}

impl ControlHandler {
    /// Creates a handler bound to a run's context.
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Handles one control delivery. Never panics, never blocks on the task.
    pub fn handle(&self, code: ControlCode) -> ControlResult {
        catch_unwind(AssertUnwindSafe(|| self.dispatch(code))).unwrap_or(ControlResult::NotHandled)
    }

    /// Wraps the handler into the callback shape the control plane registers.
    pub fn into_callback(self) -> ControlCallback {
        Arc::new(move |code| self.handle(code))
    }

    fn dispatch(&self, code: ControlCode) -> ControlResult {
        if !code.is_stop() {
            self.ctx
                .publish(Event::new(EventKind::ControlRejected).with_control(code.raw()));
            return ControlResult::NotHandled;
        }

        self.ctx
            .publish(Event::new(EventKind::ControlReceived).with_control(code.raw()));
        // Rejections (late duplicate after Stopped) are already published by the context.
        let _ = self.ctx.report(ServiceState::StopPending);
        self.ctx.request_stop();
        ControlResult::Handled
    }
}
