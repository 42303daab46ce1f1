//! Shared test fixtures: an in-memory transport, an in-process
//! `graphql-transport-ws` server and a one-shot HTTP responder.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mythic_link::{
    ConnectionOptions, MythicClient, MythicLinkError, MythicLinkTimeouts, PushMessage,
    PushReceiver, Result, SubscribePayload, SubscriptionTransport, TransportConnector,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    http::header::SEC_WEBSOCKET_PROTOCOL,
    protocol::{frame::coding::CloseCode, CloseFrame},
    Message,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `condition` every 10ms until it holds or `WAIT` elapses.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── In-memory transport ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTransport {
    senders: Mutex<HashMap<String, mpsc::Sender<PushMessage>>>,
    payloads: Mutex<Vec<(String, SubscribePayload)>>,
    released: Mutex<Vec<String>>,
    shut_down: AtomicBool,
    fail_subscribe: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push a message to a logical subscription. Returns `false` if the id is
    /// unknown or its receiver is gone.
    pub async fn push(&self, id: &str, message: PushMessage) -> bool {
        let sender = self.senders.lock().unwrap().get(id).cloned();
        match sender {
            Some(sender) => sender.send(message).await.is_ok(),
            None => false,
        }
    }

    pub async fn push_rows(&self, id: &str, root_field: &str, rows: Value) -> bool {
        let mut data = serde_json::Map::new();
        data.insert(root_field.to_string(), rows);
        self.push(id, PushMessage::Data(Value::Object(data))).await
    }

    pub fn payloads(&self) -> Vec<(String, SubscribePayload)> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn last_payload(&self) -> Option<(String, SubscribePayload)> {
        self.payloads.lock().unwrap().last().cloned()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.senders.lock().unwrap().contains_key(id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn fail_next_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    fn release_id(&self, id: &str) {
        if self.senders.lock().unwrap().remove(id).is_some() {
            self.released.lock().unwrap().push(id.to_string());
        }
    }
}

#[async_trait]
impl SubscriptionTransport for MockTransport {
    async fn subscribe(&self, id: &str, payload: SubscribePayload) -> Result<PushReceiver> {
        if self.fail_subscribe.swap(false, Ordering::SeqCst) {
            return Err(MythicLinkError::SubscriptionFailed("rejected by mock".to_string()));
        }
        let (tx, rx) = mpsc::channel(1024);
        self.senders.lock().unwrap().insert(id.to_string(), tx);
        self.payloads.lock().unwrap().push((id.to_string(), payload));
        Ok(rx)
    }

    async fn unsubscribe(&self, id: &str) -> Result<()> {
        self.release_id(id);
        Ok(())
    }

    fn release(&self, id: &str) {
        self.release_id(id);
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.senders.lock().unwrap().clear();
    }

    fn is_connected(&self) -> bool {
        !self.is_shut_down()
    }
}

pub struct MockConnector {
    pub transport: Arc<MockTransport>,
    connects: AtomicUsize,
    delay: Duration,
    params: Mutex<Option<Value>>,
}

impl MockConnector {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Self::with_delay(transport, Duration::ZERO)
    }

    /// Connector that takes `delay` to build the transport.
    pub fn with_delay(transport: Arc<MockTransport>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            transport,
            connects: AtomicUsize::new(0),
            delay,
            params: Mutex::new(None),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connection_params(&self) -> Option<Value> {
        self.params.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(&self, connection_params: Value) -> Result<Arc<dyn SubscriptionTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *self.params.lock().unwrap() = Some(connection_params);
        let transport: Arc<dyn SubscriptionTransport> = self.transport.clone();
        Ok(transport)
    }
}

/// Authenticated client on operation 1 backed by `connector`.
pub fn mock_client(connector: Arc<MockConnector>) -> MythicClient {
    MythicClient::builder()
        .server_url("mythic.test:7443")
        .api_token("test-token")
        .current_operation(1)
        .transport_connector(connector)
        .build()
        .expect("client should build")
}

// ── In-process graphql-transport-ws server ──────────────────────────────────

fn echo_subprotocol(
    request: &Request,
    mut response: Response,
) -> std::result::Result<Response, ErrorResponse> {
    if let Some(protocol) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol.clone());
    }
    Ok(response)
}

/// Minimal Mythic-like GraphQL WebSocket endpoint.
///
/// Acknowledges `connection_init` (or rejects it with close code 4403),
/// answers `ping`, records every client message and sends whatever the test
/// queues through [`send`](Self::send).
pub struct MockGraphqlServer {
    pub addr: SocketAddr,
    client_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
    outgoing_tx: mpsc::UnboundedSender<String>,
    connections: Arc<AtomicUsize>,
    _task: JoinHandle<()>,
}

impl MockGraphqlServer {
    pub async fn start() -> Self {
        Self::start_with(false).await
    }

    pub async fn start_rejecting_init() -> Self {
        Self::start_with(true).await
    }

    async fn start_with(reject_init: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<String>();
        let outgoing_rx = Arc::new(tokio::sync::Mutex::new(outgoing_rx));
        let connections = Arc::new(AtomicUsize::new(0));
        let connections_task = connections.clone();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, echo_subprotocol).await
                else {
                    continue;
                };
                connections_task.fetch_add(1, Ordering::SeqCst);
                let client_tx = client_tx.clone();
                let outgoing_rx = outgoing_rx.clone();

                tokio::spawn(async move {
                    let mut outgoing = outgoing_rx.lock().await;
                    loop {
                        tokio::select! {
                            frame = ws.next() => {
                                let text = match frame {
                                    Some(Ok(Message::Text(text))) => text,
                                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                    _ => continue,
                                };
                                let Ok(message) = serde_json::from_str::<Value>(text.as_str()) else {
                                    continue;
                                };
                                let kind = message["type"].as_str().unwrap_or_default().to_string();
                                let _ = client_tx.send(message);
                                match kind.as_str() {
                                    "connection_init" if reject_init => {
                                        let _ = ws
                                            .close(Some(CloseFrame {
                                                code: CloseCode::from(4403),
                                                reason: "Forbidden".into(),
                                            }))
                                            .await;
                                        break;
                                    },
                                    "connection_init" => {
                                        let ack = json!({"type": "connection_ack"}).to_string();
                                        if ws.send(Message::Text(ack.into())).await.is_err() {
                                            break;
                                        }
                                    },
                                    "ping" => {
                                        let pong = json!({"type": "pong"}).to_string();
                                        let _ = ws.send(Message::Text(pong.into())).await;
                                    },
                                    _ => {},
                                }
                            }
                            text = outgoing.recv() => {
                                let Some(text) = text else { break };
                                if ws.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            client_rx: tokio::sync::Mutex::new(client_rx),
            outgoing_tx,
            connections,
            _task: task,
        }
    }

    /// `host:port`, for `MythicClientBuilder::server_url` with `ssl(false)`.
    pub fn server_url(&self) -> String {
        self.addr.to_string()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn send(&self, message: Value) {
        let _ = self.outgoing_tx.send(message.to_string());
    }

    /// Next client message of the given `type`, skipping others.
    pub async fn expect_client_message(&self, kind: &str) -> Value {
        let mut rx = self.client_rx.lock().await;
        tokio::time::timeout(WAIT, async {
            loop {
                let message = rx.recv().await.expect("server task stopped");
                if message["type"] == kind {
                    return message;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no '{}' message from the client", kind))
    }

    /// Client for this server: API token, operation 1, fast timeouts, no
    /// keepalive and no reconnection.
    pub fn client(&self) -> MythicClient {
        self.client_with(Duration::from_secs(2), ConnectionOptions::new())
    }

    /// Like [`client`](Self::client) with a custom subscribe timeout and
    /// connection options. Reconnection stays off.
    pub fn client_with(
        &self,
        subscribe_timeout: Duration,
        options: ConnectionOptions,
    ) -> MythicClient {
        MythicClient::builder()
            .server_url(self.server_url())
            .ssl(false)
            .api_token("ws-token")
            .current_operation(1)
            .timeouts(
                MythicLinkTimeouts::builder()
                    .connection_timeout_secs(2)
                    .ack_timeout(Duration::from_secs(2))
                    .subscribe_timeout(subscribe_timeout)
                    .keepalive_interval(Duration::ZERO)
                    .build(),
            )
            .connection_options(options.with_auto_reconnect(false))
            .build()
            .expect("client should build")
    }
}

// ── One-shot HTTP responder ─────────────────────────────────────────────────

/// Serve exactly one HTTP request with `status` and a JSON `body`.
///
/// The returned task resolves to the raw request (head and body).
pub async fn serve_http_once(status: u16, body: Value) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let task = tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return String::new();
        };

        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            if request_complete(&raw) {
                break;
            }
        }

        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
        String::from_utf8_lossy(&raw).into_owned()
    });
    (addr, task)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..head_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    raw.len() >= head_end + 4 + content_length
}
