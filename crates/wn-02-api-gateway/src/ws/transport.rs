//! WebSocket write half as an [`EventSink`].

use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::timeout;
use wn_01_subscriptions::{EventSink, TransportError};

/// Writes delivered payloads as text frames, each bounded by a timeout.
pub struct WsSink<T> {
    inner: T,
    write_timeout: Duration,
}

impl<T> WsSink<T> {
    pub fn new(inner: T, write_timeout: Duration) -> Self {
        Self {
            inner,
            write_timeout,
        }
    }
}

#[async_trait]
impl<T> EventSink for WsSink<T>
where
    T: Sink<Message> + Unpin + Send,
    T::Error: Display + Send,
{
    async fn deliver(&mut self, payload: Bytes) -> Result<(), TransportError> {
        // Payloads are serialized JSON, so they are valid UTF-8.
        let text = String::from_utf8(payload.to_vec())
            .map_err(|e| TransportError::Write(e.to_string()))?;

        match timeout(self.write_timeout, self.inner.send(Message::Text(text))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Write(e.to_string())),
            Err(_) => Err(TransportError::Timeout(self.write_timeout)),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let close = async {
            self.inner.send(Message::Close(None)).await?;
            self.inner.close().await
        };

        match timeout(self.write_timeout, close).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Write(e.to_string())),
            Err(_) => Err(TransportError::Timeout(self.write_timeout)),
        }
    }
}
