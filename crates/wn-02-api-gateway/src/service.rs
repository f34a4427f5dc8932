//! API Gateway service - binds and serves the two listeners.
//!
//! The API listener carries `POST /event`, `GET /status` and `GET /health`.
//! The WebSocket listener carries the upgrade path and `GET /health`.
//! Either listener serves TLS when its section names a certificate and key.

use crate::domain::config::{GatewayConfig, TlsFiles};
use crate::domain::error::GatewayError;
use crate::http::{health_check, publish_event, status, ApiState};
use crate::middleware::{ApiSecretLayer, BodyLimitLayer};
use crate::ws::run_session;
use axum::{
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    response::Response,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{debug, error, info};
use wn_01_subscriptions::{SubscriptionApi, SubscriptionManager};

/// API Gateway service state
pub struct GatewayService {
    config: GatewayConfig,
    manager: Arc<dyn SubscriptionApi>,
}

impl GatewayService {
    /// Create a gateway with its own subscription manager
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let manager = Arc::new(SubscriptionManager::with_queue_capacity(
            config.websocket_secret.as_bytes(),
            config.websocket.queue_capacity,
        ));
        Self::with_manager(config, manager)
    }

    /// Create a gateway around an existing manager
    pub fn with_manager(
        config: GatewayConfig,
        manager: Arc<dyn SubscriptionApi>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn manager(&self) -> Arc<dyn SubscriptionApi> {
        Arc::clone(&self.manager)
    }

    /// Build the publish/status router
    pub fn api_router(&self) -> Router {
        let state = ApiState {
            manager: Arc::clone(&self.manager),
        };

        Router::new()
            .route(
                "/event",
                post(publish_event).layer(DefaultBodyLimit::disable()),
            )
            .route("/status", get(status))
            .route_layer(BodyLimitLayer::new(self.config.limits.max_body_size))
            .route_layer(ApiSecretLayer::new(self.config.api_secret.as_str()))
            .route("/health", get(health_check))
            .with_state(state)
    }

    /// Build the WebSocket router
    pub fn ws_router(&self) -> Router {
        let state = WsState {
            manager: Arc::clone(&self.manager),
            write_timeout: self.config.websocket.write_timeout,
            max_message_size: self.config.websocket.max_message_size,
        };

        Router::new()
            .route(&self.config.websocket.path, get(websocket_upgrade))
            .route("/health", get(health_check))
            .with_state(state)
    }

    /// Load certificates and bind both listeners
    pub async fn bind(self) -> Result<BoundGateway, GatewayError> {
        let api_tls = load_tls("API", self.config.api.tls()?).await?;
        let ws_tls = load_tls("WebSocket", self.config.websocket.tls()?).await?;

        let api_listener = bind(self.config.api_addr()).await?;
        let ws_listener = bind(self.config.ws_addr()).await?;

        Ok(BoundGateway {
            api: Listener {
                listener: api_listener,
                router: self.api_router(),
                tls: api_tls,
            },
            ws: Listener {
                listener: ws_listener,
                router: self.ws_router(),
                tls: ws_tls,
            },
        })
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind { addr, source })
}

async fn load_tls(
    listener: &'static str,
    files: Option<TlsFiles>,
) -> Result<Option<RustlsConfig>, GatewayError> {
    let Some(files) = files else {
        debug!(listener, "TLS disabled");
        return Ok(None);
    };

    // Fails harmlessly when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = RustlsConfig::from_pem_file(&files.cert, &files.key)
        .await
        .map_err(|source| GatewayError::Tls { listener, source })?;

    info!(listener, cert = %files.cert.display(), "TLS enabled");
    Ok(Some(config))
}

/// How long TLS connections may finish after shutdown is requested
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// One bound socket with its routes and optional TLS
struct Listener {
    listener: TcpListener,
    router: Router,
    tls: Option<RustlsConfig>,
}

/// Gateway with both sockets bound, ready to serve
pub struct BoundGateway {
    api: Listener,
    ws: Listener,
}

impl BoundGateway {
    /// Actual API address (resolves port 0)
    pub fn api_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.api.listener.local_addr().map_err(GatewayError::Serve)
    }

    /// Actual WebSocket address (resolves port 0)
    pub fn ws_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.ws.listener.local_addr().map_err(GatewayError::Serve)
    }

    pub fn api_tls(&self) -> bool {
        self.api.tls.is_some()
    }

    pub fn ws_tls(&self) -> bool {
        self.ws.tls.is_some()
    }

    /// Serve both listeners until `shutdown` resolves or either server fails.
    ///
    /// Shutdown stops accepting; open WebSocket sessions end on their own as
    /// their sockets close.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop, _) = watch::channel(false);
        let stop = Arc::new(stop);

        let api_addr = self.api_addr()?;
        let ws_addr = self.ws_addr()?;

        info!(addr = %api_addr, tls = self.api.tls.is_some(), "Starting API server");
        let api = spawn_server(self.api, Arc::clone(&stop));

        info!(addr = %ws_addr, tls = self.ws.tls.is_some(), "Starting WebSocket server");
        let ws = spawn_server(self.ws, Arc::clone(&stop));

        let signal = {
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                shutdown.await;
                info!("Received shutdown signal");
                stop.send_replace(true);
            })
        };

        let (api_result, ws_result) = tokio::join!(api, ws);
        signal.abort();

        info!("Gateway stopped");
        flatten("API", api_result)?;
        flatten("WebSocket", ws_result)?;
        Ok(())
    }
}

/// Serve one listener; stop everything when it exits for any reason.
fn spawn_server(listener: Listener, stop: Arc<watch::Sender<bool>>) -> JoinHandle<io::Result<()>> {
    let mut stopped = stop.subscribe();
    let Listener {
        listener,
        router,
        tls,
    } = listener;

    tokio::spawn(async move {
        let result = match tls {
            None => {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = stopped.wait_for(|stopped| *stopped).await;
                    })
                    .await
            }
            Some(tls) => serve_tls(listener, router, tls, stopped).await,
        };
        stop.send_replace(true);
        result
    })
}

async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: RustlsConfig,
    mut stopped: watch::Receiver<bool>,
) -> io::Result<()> {
    let listener = listener.into_std()?;
    let handle = Handle::new();

    let watcher = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let _ = stopped.wait_for(|stopped| *stopped).await;
            handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        })
    };

    let result = axum_server::from_tcp_rustls(listener, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await;
    watcher.abort();
    result
}

fn flatten(
    server: &str,
    result: Result<io::Result<()>, tokio::task::JoinError>,
) -> Result<(), GatewayError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(server, error = %e, "Server error");
            Err(GatewayError::Serve(e))
        }
        Err(e) => {
            error!(server, error = %e, "Server task failed");
            Err(GatewayError::Task(e.to_string()))
        }
    }
}

#[derive(Clone)]
struct WsState {
    manager: Arc<dyn SubscriptionApi>,
    write_timeout: Duration,
    max_message_size: usize,
}

async fn websocket_upgrade(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    let WsState {
        manager,
        write_timeout,
        max_message_size,
    } = state;

    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| run_session(socket, manager, write_timeout))
}
