//! Wire-level tests against an in-process `graphql-transport-ws` server and
//! a one-shot HTTP responder for `/auth` and `/refresh`.

use mythic_link::{
    ConnectionOptions, MythicClient, MythicLinkError, SubscriptionConfig, SubscriptionKind,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

mod common;

use common::{eventually, serve_http_once, MockGraphqlServer, WAIT};

fn noop_config(kind: SubscriptionKind) -> SubscriptionConfig {
    SubscriptionConfig::new(kind, |_| Ok(()))
}

#[tokio::test]
async fn test_connection_init_carries_credentials() {
    common::init_logger();
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let _sub = client.subscribe(noop_config(SubscriptionKind::Alert)).await.unwrap();

    let init = server.expect_client_message("connection_init").await;
    assert_eq!(init["payload"], json!({"headers": {"apitoken": "ws-token"}}));
    assert!(client.is_connected());
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_next_is_routed_by_id() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let mut tasks = client.subscribe(noop_config(SubscriptionKind::TaskOutput)).await.unwrap();
    let mut callbacks = client.subscribe(noop_config(SubscriptionKind::Callback)).await.unwrap();

    let first = server.expect_client_message("subscribe").await;
    let second = server.expect_client_message("subscribe").await;
    assert_eq!(first["id"], tasks.id());
    assert_eq!(first["payload"]["operationName"], "TaskOutputSubscription");
    assert_eq!(first["payload"]["variables"]["operation_id"], 1);
    assert_eq!(second["id"], callbacks.id());

    server.send(json!({
        "type": "next",
        "id": callbacks.id(),
        "payload": {"data": {"callback": [{"id": 9, "host": "WS01"}]}}
    }));
    server.send(json!({
        "type": "next",
        "id": tasks.id(),
        "payload": {"data": {"task_output": [{"id": 3, "output": "whoami"}]}}
    }));

    let event = timeout(WAIT, callbacks.next_event()).await.unwrap().unwrap();
    assert_eq!(event.kind, SubscriptionKind::Callback);
    assert_eq!(event.rows()[0]["host"], "WS01");

    let event = timeout(WAIT, tasks.next_event()).await.unwrap().unwrap();
    assert_eq!(event.get_data_field("task_output").unwrap()[0]["output"], "whoami");

    assert!(callbacks.events().try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribe_sends_complete() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let sub = client.subscribe(noop_config(SubscriptionKind::File)).await.unwrap();
    server.expect_client_message("subscribe").await;

    client.unsubscribe(&sub.handle()).unwrap();
    let complete = server.expect_client_message("complete").await;
    assert_eq!(complete["id"], sub.id());

    timeout(WAIT, sub.done()).await.unwrap();
    assert!(eventually(|| client.active_subscription_count() == 0).await);
}

#[tokio::test]
async fn test_server_error_closes_subscription() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let mut sub = client.subscribe(noop_config(SubscriptionKind::Alert)).await.unwrap();
    server.expect_client_message("subscribe").await;

    server.send(json!({
        "type": "error",
        "id": sub.id(),
        "payload": [{"message": "field 'operationalert' not found in type: 'subscription_root'"}]
    }));

    let err = timeout(WAIT, sub.next_error()).await.unwrap().unwrap();
    match err {
        MythicLinkError::TransportError(message) => assert!(message.contains("operationalert")),
        other => panic!("expected a transport error, got {:?}", other),
    }
    timeout(WAIT, sub.done()).await.expect("server error should end the subscription");
    assert!(!sub.is_active());
}

#[tokio::test]
async fn test_next_with_errors_keeps_subscription() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let mut sub = client.subscribe(noop_config(SubscriptionKind::Callback)).await.unwrap();
    server.expect_client_message("subscribe").await;

    server.send(json!({
        "type": "next",
        "id": sub.id(),
        "payload": {"data": null, "errors": [{"message": "permission denied"}]}
    }));
    let err = timeout(WAIT, sub.next_error()).await.unwrap().unwrap();
    assert!(matches!(err, MythicLinkError::TransportError(ref m) if m.contains("permission denied")));
    assert!(sub.is_active());

    server.send(json!({
        "type": "next",
        "id": sub.id(),
        "payload": {"data": {"callback": []}}
    }));
    assert!(timeout(WAIT, sub.next_event()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_subscriptions_snapshot() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();
    assert!(client.subscriptions().await.is_empty());

    let mut sub = client.subscribe(noop_config(SubscriptionKind::File)).await.unwrap();
    server.expect_client_message("subscribe").await;
    server.send(json!({
        "type": "next",
        "id": sub.id(),
        "payload": {"data": {"filemeta": [{"id": 1}]}}
    }));
    // Routing counts the message before handing it to the pump.
    timeout(WAIT, sub.next_event()).await.unwrap().unwrap();

    let infos = client.subscriptions().await;
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].id, sub.id());
    assert_eq!(infos[0].operation_name.as_deref(), Some("FileSubscription"));
    assert_eq!(infos[0].events_routed, 1);
    assert!(infos[0].last_event_time_ms.is_some());
}

#[tokio::test]
async fn test_close_completes_and_disconnects() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let sub = client.subscribe(noop_config(SubscriptionKind::TaskOutput)).await.unwrap();
    server.expect_client_message("subscribe").await;

    client.close().await;

    let complete = server.expect_client_message("complete").await;
    assert_eq!(complete["id"], sub.id());
    timeout(WAIT, sub.done()).await.unwrap();
    assert!(eventually(|| !client.is_connected()).await);
}

#[tokio::test]
async fn test_rejected_init_fails_subscribe_without_reconnect() {
    let server = MockGraphqlServer::start_rejecting_init().await;
    let client = server.client();

    let err = client.subscribe(noop_config(SubscriptionKind::Alert)).await.unwrap_err();
    assert!(matches!(err, MythicLinkError::WebSocketError(_)), "{err}");
    assert_eq!(client.active_subscription_count(), 0);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_subscribe_is_queued_while_reconnecting() {
    // Nothing listens on this port, so every connection attempt is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = MythicClient::builder()
        .server_url(url)
        .ssl(false)
        .api_token("t")
        .current_operation(1)
        .connection_options(
            ConnectionOptions::new()
                .with_reconnect_delay_ms(50)
                .with_max_reconnect_delay_ms(50),
        )
        .build()
        .unwrap();

    let sub = client.subscribe(noop_config(SubscriptionKind::Callback)).await.unwrap();
    assert!(sub.is_active());
    assert!(!client.is_connected());
    assert_eq!(client.subscriptions().await.len(), 1);

    client.close().await;
    timeout(WAIT, sub.done()).await.unwrap();
}

#[tokio::test]
async fn test_login_stores_tokens_and_operation() {
    let (addr, request) = serve_http_once(
        200,
        json!({
            "access_token": "jwt-1",
            "refresh_token": "refresh-1",
            "user": {"id": 1, "username": "mythic_admin", "current_operation_id": 4}
        }),
    )
    .await;

    let client = MythicClient::builder()
        .server_url(format!("https://{}", addr))
        .ssl(false)
        .credentials("mythic_admin", "hunter2")
        .build()
        .unwrap();
    assert!(!client.is_authenticated());

    client.login().await.unwrap();

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /auth HTTP/1.1"));
    assert!(raw.contains(r#""username":"mythic_admin""#));
    assert!(raw.contains(r#""password":"hunter2""#));

    assert!(client.is_authenticated());
    assert_eq!(client.current_operation(), Some(4));
    assert_eq!(client.session().access_token().as_deref(), Some("jwt-1"));
    assert_eq!(client.session().refresh_token().as_deref(), Some("refresh-1"));

    // Already authenticated: no request is made.
    client.login().await.unwrap();
}

#[tokio::test]
async fn test_login_failure_is_an_authentication_error() {
    let (addr, _request) = serve_http_once(403, json!({"status": "error"})).await;
    let client = MythicClient::builder()
        .server_url(addr.to_string())
        .ssl(false)
        .build()
        .unwrap();

    let err = client.login_with_credentials("mythic_admin", "wrong").await.unwrap_err();
    match err {
        MythicLinkError::AuthenticationError(message) => {
            assert!(message.contains("status 403"), "{message}")
        },
        other => panic!("expected an authentication error, got {:?}", other),
    }
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_refresh_sends_both_tokens_with_bearer() {
    let (addr, request) = serve_http_once(
        200,
        json!({"access_token": "jwt-2", "refresh_token": "refresh-2", "user": {"id": 1}}),
    )
    .await;
    let client = MythicClient::builder()
        .server_url(addr.to_string())
        .ssl(false)
        .access_token("jwt-1")
        .refresh_token("refresh-1")
        .current_operation(2)
        .build()
        .unwrap();

    client.refresh_access_token().await.unwrap();

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /refresh HTTP/1.1"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer jwt-1"));
    assert!(raw.contains(r#""access_token":"jwt-1""#));
    assert!(raw.contains(r#""refresh_token":"refresh-1""#));

    assert_eq!(client.session().access_token().as_deref(), Some("jwt-2"));
    assert_eq!(client.session().refresh_token().as_deref(), Some("refresh-2"));
    assert_eq!(client.current_operation(), Some(2));
}

#[tokio::test]
async fn test_timed_out_subscribe_leaves_no_entry() {
    let server = MockGraphqlServer::start().await;
    let client = server.client_with(
        Duration::from_millis(300),
        ConnectionOptions::new().with_routing_channel_capacity(1),
    );

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();
    let config = SubscriptionConfig::new(SubscriptionKind::Callback, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .with_buffer_size(1);
    let mut slow = client.subscribe(config).await.unwrap();
    server.expect_client_message("subscribe").await;

    // Nobody reads `slow`, so the events channel, the routing channel and
    // finally the connection task back up.
    for i in 0..5 {
        server.send(json!({
            "type": "next",
            "id": slow.id(),
            "payload": {"data": {"callback": [{"id": i}]}}
        }));
    }
    assert!(eventually(|| handled.load(Ordering::SeqCst) >= 2).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(timeout(Duration::from_millis(200), client.subscriptions()).await.is_err());

    let err = client.subscribe(noop_config(SubscriptionKind::File)).await.unwrap_err();
    assert!(matches!(err, MythicLinkError::TimeoutError(_)), "got {err:?}");

    for _ in 0..5 {
        timeout(WAIT, slow.next_event()).await.unwrap().unwrap();
    }

    let listed = client.subscriptions().await;
    assert_eq!(listed.len(), 1, "timed out subscribe must not linger: {listed:?}");
    assert_eq!(listed[0].id, slow.id());
    assert_eq!(client.active_subscription_count(), 1);
}

#[tokio::test]
async fn test_dropping_client_completes_on_the_wire() {
    let server = MockGraphqlServer::start().await;
    let client = server.client();

    let sub = client.subscribe(noop_config(SubscriptionKind::Alert)).await.unwrap();
    server.expect_client_message("subscribe").await;

    drop(client);
    let complete = server.expect_client_message("complete").await;
    assert_eq!(complete["id"], sub.id());
    timeout(WAIT, sub.done()).await.unwrap();
}
