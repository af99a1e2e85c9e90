//! Push-channel connection management
//!
//! [`ConnectionMachine`] is the single authoritative connection state and
//! contains every transition rule; it performs no I/O. [`ConnectionManager`]
//! runs the machine inside a tokio task, talks to a [`Transport`], sleeps
//! out backoff delays and forwards inbound frames untouched.

mod machine;
mod manager;
mod transport;

pub use machine::{ConnectionMachine, ConnectionSnapshot, ConnectionState, FailureOutcome};
pub use manager::{ConnectionEvent, ConnectionManager, InboundFrame};
pub use transport::{ChannelStream, Transport};
