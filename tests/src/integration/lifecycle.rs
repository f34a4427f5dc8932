//! # Connection Lifecycle and Rejection Tests
//!
//! 1. **Cleanup**: a departed subscriber leaves no trace in the indices
//! 2. **Rejection**: bad tokens and bad frames end the session
//! 3. **Publish guards**: secret, body size, strict JSON
//! 4. **Shutdown**: the gateway stops on request

#[cfg(test)]
mod tests {
    use crate::integration::harness::{Received, TestGateway, API_SECRET};
    use serde_json::json;
    use wn_01_subscriptions::RelayStatus;

    #[tokio::test]
    async fn test_disconnect_removes_every_subscription() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;
        client.subscribe(&["a", "b"]).await;
        gateway.settle_tag("b", 1).await;

        client.close().await;

        let status = gateway
            .settle(|s| s.connections == 0 && s.subscriptions.is_empty())
            .await;
        assert_eq!(status, RelayStatus::default());
        assert_eq!(gateway.publish_ok("late", &["a", "b"], "").await, 0);
    }

    #[tokio::test]
    async fn test_bad_token_closes_connection() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;

        client.subscribe_signed(&["room1"], "deadbeef").await;

        assert_eq!(client.recv(std::time::Duration::from_secs(5)).await, Received::Closed);
        assert_eq!(gateway.manager.status(), RelayStatus::default());
        assert_eq!(gateway.publish_ok("ping", &["room1"], "hi").await, 0);
    }

    #[tokio::test]
    async fn test_token_for_other_order_is_rejected() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;

        let signature = wn_01_subscriptions::derive_token(&["b", "a"], b"secret");
        client.subscribe_signed(&["a", "b"], &signature).await;

        assert_eq!(client.recv(std::time::Duration::from_secs(5)).await, Received::Closed);
        assert_eq!(gateway.manager.status(), RelayStatus::default());
    }

    #[tokio::test]
    async fn test_malformed_frame_closes_connection() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;
        client.subscribe(&["keep"]).await;
        gateway.settle_tag("keep", 1).await;

        client.send(json!("not a request")).await;

        assert_eq!(client.recv(std::time::Duration::from_secs(5)).await, Received::Closed);
        gateway
            .settle(|s| s.connections == 0 && s.subscriptions.is_empty())
            .await;
    }

    #[tokio::test]
    async fn test_other_connections_survive_a_rejection() {
        let gateway = TestGateway::start().await;
        let mut good = gateway.connect().await;
        let mut bad = gateway.connect().await;
        good.subscribe(&["room1"]).await;
        gateway.settle_tag("room1", 1).await;

        bad.subscribe_signed(&["room1"], "forged").await;
        assert_eq!(bad.recv(std::time::Duration::from_secs(5)).await, Received::Closed);

        assert_eq!(gateway.publish_ok("ping", &["room1"], "hi").await, 1);
        assert_eq!(good.expect_payload().await["data"], "hi");
    }

    #[tokio::test]
    async fn test_publish_requires_secret() {
        let gateway = TestGateway::start().await;
        let body = json!({ "name": "ping", "tags": ["room1"], "data": "hi" }).to_string();

        let missing = gateway.publish_raw(None, body.clone()).await;
        assert_eq!(missing.status(), 401);

        let wrong = gateway.publish_raw(Some("not-the-secret"), body.clone()).await;
        assert_eq!(wrong.status(), 401);
        assert_eq!(wrong.text().await.unwrap().trim(), "Unauthorized");

        let right = gateway.publish_raw(Some(API_SECRET), body).await;
        assert_eq!(right.status(), 200);
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_bodies() {
        let gateway = TestGateway::start_with(|config| config.limits.max_body_size = 128).await;

        let empty = gateway.publish_raw(Some(API_SECRET), String::new()).await;
        assert_eq!(empty.status(), 400);

        let unknown = gateway
            .publish_raw(
                Some(API_SECRET),
                json!({ "name": "n", "tags": [], "data": "", "extra": 1 }).to_string(),
            )
            .await;
        assert_eq!(unknown.status(), 400);
        assert!(unknown.text().await.unwrap().contains("unknown field `extra`"));

        let garbled = gateway
            .publish_raw(Some(API_SECRET), "{\"name\":".to_string())
            .await;
        assert_eq!(garbled.status(), 400);

        let oversized = gateway
            .publish_raw(
                Some(API_SECRET),
                json!({ "name": "n", "tags": ["t"], "data": "x".repeat(512) }).to_string(),
            )
            .await;
        assert_eq!(oversized.status(), 413);
    }

    #[tokio::test]
    async fn test_health_needs_no_secret() {
        let gateway = TestGateway::start().await;
        let response = reqwest::get(format!("http://{}/health", gateway.api_addr))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = reqwest::get(format!("http://{}/health", gateway.ws_addr))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_shutdown_stops_both_listeners() {
        let gateway = TestGateway::start().await;
        let api_addr = gateway.api_addr;
        assert_eq!(gateway.publish_ok("ping", &["nobody"], "").await, 0);

        gateway.shutdown().await.unwrap();

        assert!(tokio::net::TcpStream::connect(api_addr).await.is_err());
    }
}
