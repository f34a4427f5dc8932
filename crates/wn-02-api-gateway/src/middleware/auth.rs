//! Shared-secret authentication for the publish API.
//!
//! Publishers send the configured API secret verbatim in the `Auth` header.

use crate::ApiError;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Header carrying the API secret
pub const AUTH_HEADER: &str = "auth";

/// Authentication layer
#[derive(Clone)]
pub struct ApiSecretLayer {
    secret: Arc<str>,
}

impl ApiSecretLayer {
    /// An empty secret lets every request through.
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl<S> Layer<S> for ApiSecretLayer {
    type Service = ApiSecretService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiSecretService {
            inner,
            secret: Arc::clone(&self.secret),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct ApiSecretService<S> {
    inner: S,
    secret: Arc<str>,
}

impl<S> Service<Request<Body>> for ApiSecretService<S>
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
        let secret = Arc::clone(&self.secret);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !is_authorized(&req, &secret) {
                warn!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    "Rejected request with missing or invalid Auth header"
                );
                return Ok(ApiError::unauthorized().into_response());
            }

            inner.call(req).await
        })
    }
}

fn is_authorized<B>(req: &Request<B>, secret: &str) -> bool {
    if secret.is_empty() {
        return true;
    }

    req.headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|presented| constant_time_compare(presented, secret))
}

/// Constant-time string comparison to prevent timing attacks
///
/// Runs in time dependent only on the longer input, and never reports
/// equality for inputs of different length.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    // Different pad bytes so a prefix never matches its extension.
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
