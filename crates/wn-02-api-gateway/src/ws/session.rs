//! Inbound session loop for one WebSocket connection.
//!
//! Each accepted socket gets two tasks: this read loop, which turns client
//! frames into subscribe/unsubscribe calls, and a delivery pump owning the
//! write half. Whichever side fails first closes the connection through the
//! manager; the other side observes the close and stops.

use crate::ws::transport::WsSink;
use axum::extract::ws::{Message, WebSocket};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wn_01_subscriptions::{
    sanitize_tags, Connection, DeliveryPump, SubscriptionApi, SubscriptionError,
};

/// A client frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscriptionRequest {
    /// Tags to join or leave, in the order the token was derived for
    pub tags: Vec<String>,
    /// Token for `tags`; ignored when unsubscribing
    pub signature: String,
    /// Leave `tags` instead of joining them
    pub unsubscribe: bool,
}

/// Why a session loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame or end of stream
    Disconnected,
    /// Transport read failure
    ReadError(String),
    /// Frame that is not a valid subscription request
    MalformedFrame(String),
    /// Subscribe with a bad signature
    Unauthorized,
    /// Connection closed elsewhere, e.g. by a failed delivery
    ClosedElsewhere,
}

/// Serve one upgraded socket until either side ends.
pub async fn run_session(
    socket: WebSocket,
    manager: Arc<dyn SubscriptionApi>,
    write_timeout: Duration,
) {
    let (connection, queue) = manager.open_connection();
    let (write, read) = socket.split();

    info!(connection = %connection.key(), "WebSocket connection opened");

    let pump = DeliveryPump::new(
        Arc::clone(&connection),
        queue,
        WsSink::new(write, write_timeout),
        Arc::clone(&manager),
    );
    let pump = tokio::spawn(pump.run());

    let end = read_loop(manager.as_ref(), &connection, read).await;
    match &end {
        SessionEnd::Disconnected | SessionEnd::ClosedElsewhere => {
            debug!(connection = %connection.key(), reason = ?end, "Session ended");
        }
        _ => warn!(connection = %connection.key(), reason = ?end, "Session terminated"),
    }

    manager.close_connection(&connection);
    match pump.await {
        Ok(exit) => debug!(
            connection = %connection.key(),
            delivered = exit.delivered(),
            "Delivery pump finished"
        ),
        Err(e) => warn!(connection = %connection.key(), error = %e, "Delivery pump task failed"),
    }
}

/// Read client frames until the session should end.
///
/// Does not close the connection itself; the caller does that once for
/// every exit path.
pub async fn read_loop<St, E>(
    manager: &dyn SubscriptionApi,
    connection: &Arc<Connection>,
    mut stream: St,
) -> SessionEnd
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = tokio::select! {
            _ = connection.closed() => return SessionEnd::ClosedElsewhere,
            frame = stream.next() => frame,
        };

        let body = match frame {
            None | Some(Ok(Message::Close(_))) => return SessionEnd::Disconnected,
            Some(Err(e)) => return SessionEnd::ReadError(e.to_string()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(data))) => data,
        };

        let request: SubscriptionRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return SessionEnd::MalformedFrame(e.to_string()),
        };

        let tags = sanitize_tags(&request.tags);
        if request.unsubscribe {
            manager.unsubscribe(connection, &tags);
            continue;
        }

        match manager.subscribe(connection, &tags, &request.signature) {
            Ok(_) => {}
            Err(SubscriptionError::Unauthorized) => return SessionEnd::Unauthorized,
            Err(SubscriptionError::ConnectionClosed) => return SessionEnd::ClosedElsewhere,
            Err(e) => return SessionEnd::ReadError(e.to_string()),
        }
    }
}
