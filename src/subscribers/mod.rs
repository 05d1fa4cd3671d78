//! # Event subscribers.
//!
//! ```text
//! Bus ──► event forwarder (host runtime) ──► SubscriberSet
//!                                               ├──► LogWriter ──► tracing
//!                                               └──► custom subscribers
//! ```
//!
//! Implement [`Subscribe`] for custom observers and pass them to
//! [`DispatcherBuilder::with_subscribers`](crate::DispatcherBuilder::with_subscribers).

mod embedded;
mod set;
mod subscriber;

pub use embedded::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
