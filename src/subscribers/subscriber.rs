//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for observing a service run: logging,
//! metrics, audit trails.
//!
//! Each subscriber gets:
//! - a dedicated worker task on the host runtime
//! - a bounded queue (capacity via [`Subscribe::queue_capacity`])
//! - panic isolation (panics are reported as `EventKind::SubscriberPanicked`)
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use servicevisor::{Event, EventKind, Subscribe};
//!
//! struct StopAudit;
//!
//! #[async_trait]
//! impl Subscribe for StopAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ControlReceived {
//!             // record who stopped the service
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "stop-audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the runtime the hosted task also runs on.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event. Events arrive in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
