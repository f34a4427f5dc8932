//! # End-to-End Relay Tests
//!
//! ```text
//! [Publisher] ──POST /event──→ [API listener] ──distribute──→ [Tag Index]
//!                                                                  │
//!                                        ┌─────────────────────────┤
//!                                        ↓                         ↓
//!                              [queue → pump → ws]       [queue → pump → ws]
//!                                        │                         │
//!                                  [Subscriber A]            [Subscriber B]
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::harness::TestGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_only_matching_subscriber() {
        let gateway = TestGateway::start().await;
        let mut room1 = gateway.connect().await;
        let mut room2 = gateway.connect().await;

        room1.subscribe(&["room1"]).await;
        room2.subscribe(&["room2"]).await;
        gateway
            .settle(|s| s.connections == 2 && s.subscriptions.len() == 2)
            .await;

        let deliveries = gateway.publish_ok("ping", &["room1"], "hi").await;
        assert_eq!(deliveries, 1);

        assert_eq!(
            room1.expect_payload().await,
            json!({ "name": "ping", "tags": ["room1"], "data": "hi" })
        );
        room2.expect_silence().await;
    }

    #[tokio::test]
    async fn test_overlapping_tags_deliver_once_per_tag() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;

        client.subscribe(&["x", "y"]).await;
        gateway.settle_tag("y", 1).await;

        let deliveries = gateway.publish_ok("dup", &["x", "y"], "twice").await;
        assert_eq!(deliveries, 2);

        let first = client.expect_payload().await;
        let second = client.expect_payload().await;
        assert_eq!(first, second);
        assert_eq!(first["name"], "dup");
        client.expect_silence().await;
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let gateway = TestGateway::start().await;
        let mut clients = Vec::new();
        for _ in 0..5 {
            let mut client = gateway.connect().await;
            client.subscribe(&["news"]).await;
            clients.push(client);
        }
        gateway.settle_tag("news", 5).await;

        assert_eq!(gateway.publish_ok("headline", &["news"], "extra").await, 5);

        for client in &mut clients {
            assert_eq!(client.expect_payload().await["data"], "extra");
        }
    }

    #[tokio::test]
    async fn test_per_connection_order_is_publish_order() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;
        client.subscribe(&["seq"]).await;
        gateway.settle_tag("seq", 1).await;

        for i in 0..10 {
            gateway.publish_ok("tick", &["seq"], &i.to_string()).await;
        }

        for i in 0..10 {
            assert_eq!(client.expect_payload().await["data"], i.to_string());
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_over_the_wire() {
        let gateway = TestGateway::start().await;
        let mut client = gateway.connect().await;

        client.subscribe(&["a", "b"]).await;
        gateway.settle_tag("b", 1).await;
        client.unsubscribe(&["a"]).await;
        gateway.settle_tag("a", 0).await;

        assert_eq!(gateway.publish_ok("gone", &["a"], "").await, 0);
        assert_eq!(gateway.publish_ok("kept", &["b"], "").await, 1);

        assert_eq!(client.expect_payload().await["name"], "kept");
    }

    #[tokio::test]
    async fn test_status_endpoint_reports_subscriptions() {
        let gateway = TestGateway::start().await;
        let mut first = gateway.connect().await;
        let mut second = gateway.connect().await;

        first.subscribe(&["alpha", "zeta"]).await;
        second.subscribe(&["alpha"]).await;
        gateway
            .settle(|s| s.subscriptions.get("alpha") == Some(&2) && s.subscriptions.contains_key("zeta"))
            .await;

        assert_eq!(
            gateway.http_status().await,
            json!({ "connections": 2, "subscriptions": { "alpha": 2, "zeta": 1 } })
        );
    }

    #[tokio::test]
    async fn test_unsecured_relay_accepts_any_token() {
        let gateway = TestGateway::start_with(|config| {
            config.api_secret.clear();
            config.websocket_secret.clear();
        })
        .await;
        let mut client = gateway.connect().await;

        client.subscribe_signed(&["open"], "").await;
        gateway.settle_tag("open", 1).await;

        let response = gateway
            .publish_raw(None, json!({ "name": "n", "tags": ["open"] }).to_string())
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(client.expect_payload().await["data"], "");
    }
}
