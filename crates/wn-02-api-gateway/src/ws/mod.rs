//! WebSocket subscription endpoint.
//!
//! Clients send `{"tags": [...], "signature": "...", "unsubscribe": bool}`
//! frames and receive matching events as text frames.

pub mod session;
pub mod transport;

pub use session::{read_loop, run_session, SessionEnd, SubscriptionRequest};
pub use transport::WsSink;
