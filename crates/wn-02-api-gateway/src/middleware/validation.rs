//! Request body size enforcement.
//!
//! Oversize bodies are refused with 413 before they reach a handler:
//! first from the `Content-Length` header, then while buffering the body
//! for requests that stream or lie about their length.

use crate::ApiError;
use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tower::{Layer, Service};
use tracing::warn;

/// Body limit layer
#[derive(Clone, Copy)]
pub struct BodyLimitLayer {
    max_body_size: usize,
}

impl BodyLimitLayer {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }
}

impl<S> Layer<S> for BodyLimitLayer {
    type Service = BodyLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyLimitService {
            inner,
            max_body_size: self.max_body_size,
        }
    }
}

/// Body limit service
#[derive(Clone)]
pub struct BodyLimitService<S> {
    inner: S,
    max_body_size: usize,
}

impl<S> Service<Request<Body>> for BodyLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let max_body_size = self.max_body_size;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Fast path: declared length
            if let Some(len) = declared_length(&req) {
                if len > max_body_size {
                    warn!(size = len, max = max_body_size, "Request too large (from header)");
                    return Ok(ApiError::body_too_large(max_body_size).into_response());
                }
            }

            let (parts, body) = req.into_parts();
            let body_bytes = match read_body_with_limit(body, max_body_size).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Failed to read request body");
                    return Ok(e.into_response());
                }
            };

            let req = Request::from_parts(parts, Body::from(body_bytes));
            inner.call(req).await
        })
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Buffer `body`, failing with 413 once it exceeds `max_size` bytes.
///
/// A body that breaks off mid-stream is a 400, not a size violation.
pub async fn read_body_with_limit(body: Body, max_size: usize) -> Result<Bytes, ApiError> {
    let mut stream = body.into_data_stream();
    let mut buffered = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::unreadable_body)?;
        if buffered.len() + chunk.len() > max_size {
            return Err(ApiError::body_too_large(max_size));
        }
        buffered.extend_from_slice(&chunk);
    }

    Ok(buffered.freeze())
}
