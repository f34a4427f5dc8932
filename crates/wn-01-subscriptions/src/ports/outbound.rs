//! # Outbound Ports (Driven Ports / SPI)
//!
//! The transport a delivery pump writes to.

use crate::domain::errors::TransportError;
use async_trait::async_trait;
use bytes::Bytes;

/// Write side of one connection's transport.
#[async_trait]
pub trait EventSink: Send {
    /// Write one payload.
    async fn deliver(&mut self, payload: Bytes) -> Result<(), TransportError>;

    /// Close the transport. Best effort; called once when the pump stops.
    async fn close(&mut self) -> Result<(), TransportError>;
}
