//! WebSocket plumbing
//!
//! Server side only: the subscriber registry and per-connection sessions.
//! The consumer used by the tap command lives in `feed::remote`.

mod registry;
mod session;
mod types;

pub use registry::{BroadcastReport, ChannelSink, SubscriberId, SubscriberRegistry, TickSink};
pub use session::run_session;
pub use types::{DeliveryError, WsError};
