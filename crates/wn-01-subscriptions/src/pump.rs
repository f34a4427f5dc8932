//! # Delivery Pump
//!
//! One pump per connection. It is the only writer of its transport: it takes
//! payloads off the outbound queue in FIFO order and writes them to the
//! [`EventSink`]. A write failure tears the whole connection down through the
//! manager, which also unblocks any publisher waiting on the queue.

use crate::domain::connection::{Connection, OutboundQueue};
use crate::ports::inbound::SubscriptionApi;
use crate::ports::outbound::EventSink;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The connection was closed elsewhere.
    Closed { delivered: u64 },
    /// Writing to the transport failed; the pump closed the connection.
    TransportFailed { delivered: u64 },
}

impl PumpExit {
    pub fn delivered(&self) -> u64 {
        match self {
            Self::Closed { delivered } | Self::TransportFailed { delivered } => *delivered,
        }
    }
}

pub struct DeliveryPump<S, M: ?Sized> {
    connection: Arc<Connection>,
    queue: OutboundQueue,
    sink: S,
    manager: Arc<M>,
}

impl<S, M> DeliveryPump<S, M>
where
    S: EventSink,
    M: SubscriptionApi + ?Sized,
{
    pub fn new(connection: Arc<Connection>, queue: OutboundQueue, sink: S, manager: Arc<M>) -> Self {
        Self {
            connection,
            queue,
            sink,
            manager,
        }
    }

    /// Deliver until the connection closes or a write fails.
    pub async fn run(mut self) -> PumpExit {
        let key = self.queue.key();
        let mut delivered = 0;

        let exit = loop {
            let Some(payload) = self.queue.recv().await else {
                break PumpExit::Closed { delivered };
            };

            if let Err(e) = self.sink.deliver(payload).await {
                warn!(connection = %key, error = %e, "Delivery failed, closing connection");
                self.manager.close_connection(&self.connection);
                break PumpExit::TransportFailed { delivered };
            }
            delivered += 1;
        };

        if let Err(e) = self.sink.close().await {
            debug!(connection = %key, error = %e, "Transport close failed");
        }

        debug!(connection = %key, ?exit, "Delivery pump stopped");
        exit
    }
}
