//! Test harness: a live gateway on loopback plus minimal clients.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use wn_01_subscriptions::{derive_token, RelayStatus, SubscriptionApi};
use wn_02_api_gateway::{GatewayConfig, GatewayError, GatewayService};

pub const API_SECRET: &str = "api-secret";
pub const WS_SECRET: &str = "secret";

/// How long a client waits before deciding nothing is coming
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// A gateway serving on ephemeral loopback ports.
pub struct TestGateway {
    pub api_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub manager: Arc<dyn SubscriptionApi>,
    http: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
    server: JoinHandle<Result<(), GatewayError>>,
}

impl TestGateway {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut GatewayConfig)) -> Self {
        let mut config = GatewayConfig::default();
        config.api.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.api.port = 0;
        config.websocket.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.websocket.port = 0;
        config.api_secret = API_SECRET.to_string();
        config.websocket_secret = WS_SECRET.to_string();
        configure(&mut config);

        let service = GatewayService::new(config).expect("valid test config");
        let manager = service.manager();
        let bound = service.bind().await.expect("bind loopback listeners");
        let api_addr = bound.api_addr().expect("api address");
        let ws_addr = bound.ws_addr().expect("ws address");

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve(async move {
            let _ = stopped.await;
        }));

        Self {
            api_addr,
            ws_addr,
            manager,
            http: reqwest::Client::new(),
            stop: Some(stop),
            server,
        }
    }

    /// Publish an event with the configured secret.
    pub async fn publish(&self, name: &str, tags: &[&str], data: &str) -> reqwest::Response {
        self.publish_raw(
            Some(API_SECRET),
            json!({ "name": name, "tags": tags, "data": data }).to_string(),
        )
        .await
    }

    /// Publish an arbitrary body, optionally with an `Auth` header.
    pub async fn publish_raw(&self, auth: Option<&str>, body: String) -> reqwest::Response {
        let mut request = self
            .http
            .post(format!("http://{}/event", self.api_addr))
            .header("content-type", "application/json")
            .body(body);
        if let Some(auth) = auth {
            request = request.header("Auth", auth);
        }
        request.send().await.expect("publish request")
    }

    /// Publish and return the reported delivery count.
    pub async fn publish_ok(&self, name: &str, tags: &[&str], data: &str) -> u64 {
        let response = self.publish(name, tags, data).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("publish response body");
        body["deliveries"].as_u64().expect("deliveries count")
    }

    pub async fn http_status(&self) -> Value {
        let response = self
            .http
            .get(format!("http://{}/status", self.api_addr))
            .header("Auth", API_SECRET)
            .send()
            .await
            .expect("status request");
        assert_eq!(response.status(), 200);
        response.json().await.expect("status body")
    }

    /// Poll the relay until `done` holds, panicking after a few seconds.
    pub async fn settle(&self, done: impl Fn(&RelayStatus) -> bool) -> RelayStatus {
        let poll = async {
            loop {
                let status = self.manager.status();
                if done(&status) {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        match tokio::time::timeout(SETTLE_TIMEOUT, poll).await {
            Ok(status) => status,
            Err(_) => panic!("relay never settled: {:?}", self.manager.status()),
        }
    }

    /// Wait until `tag` has exactly `count` subscribers.
    pub async fn settle_tag(&self, tag: &str, count: usize) -> RelayStatus {
        self.settle(|status| status.subscriptions.get(tag).copied().unwrap_or(0) == count)
            .await
    }

    pub async fn connect(&self) -> WsClient {
        WsClient::connect(self.ws_addr).await
    }

    pub async fn shutdown(mut self) -> Result<(), GatewayError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(SETTLE_TIMEOUT, &mut self.server)
            .await
            .expect("gateway stops in time")
            .expect("gateway task")
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subscriber client speaking the relay's JSON frames.
pub struct WsClient {
    socket: Socket,
}

/// What a client saw while waiting for a frame.
#[derive(Debug, PartialEq)]
pub enum Received {
    Payload(Value),
    Closed,
    Nothing,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("websocket handshake");
        Self { socket }
    }

    /// Subscribe with a correctly derived token.
    pub async fn subscribe(&mut self, tags: &[&str]) {
        let signature = derive_token(tags, WS_SECRET.as_bytes());
        self.subscribe_signed(tags, &signature).await;
    }

    pub async fn subscribe_signed(&mut self, tags: &[&str], signature: &str) {
        self.send(json!({ "tags": tags, "signature": signature })).await;
    }

    pub async fn unsubscribe(&mut self, tags: &[&str]) {
        self.send(json!({ "tags": tags, "unsubscribe": true })).await;
    }

    pub async fn send(&mut self, frame: Value) {
        self.socket
            .send(Message::text(frame.to_string()))
            .await
            .expect("send frame");
    }

    /// Next event payload, failing the test if none arrives.
    pub async fn expect_payload(&mut self) -> Value {
        match self.recv(SETTLE_TIMEOUT).await {
            Received::Payload(value) => value,
            other => panic!("expected a payload, got {other:?}"),
        }
    }

    /// Assert nothing is delivered within the quiet period.
    pub async fn expect_silence(&mut self) {
        assert_eq!(self.recv(QUIET_PERIOD).await, Received::Nothing);
    }

    pub async fn recv(&mut self, wait: Duration) -> Received {
        let next = async {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let value = serde_json::from_str(text.as_str()).expect("JSON payload");
                        return Received::Payload(value);
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                    Some(Ok(Message::Binary(_))) => panic!("relay sends text frames"),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return Received::Closed,
                }
            }
        };
        tokio::time::timeout(wait, next)
            .await
            .unwrap_or(Received::Nothing)
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
