//! Shared GraphQL WebSocket connection.
//!
//! One background task owns the socket and multiplexes every logical
//! subscription over it:
//!
//! - `connection_init` with the session's credentials, then `connection_ack`
//! - `subscribe` / `complete` per subscription id
//! - routing of `next`, `error` and `complete` to the subscription's channel
//! - keepalive pings with a pong deadline
//! - reconnection with exponential backoff, re-sending every live
//!   subscription under its original id

use crate::{
    connection::{
        now_ms,
        transport::{PushMessage, PushReceiver, SubscriptionTransport},
        websocket::{
            connect_ws, send_client_message, send_init_and_wait_ack, upgrade_error,
            WebSocketStream,
        },
        FAR_FUTURE, MAX_WS_TEXT_MESSAGE_BYTES,
    },
    error::{MythicLinkError, Result},
    event_handlers::{ConnectionError, DisconnectReason, ErrorDisposition, EventHandlers},
    models::{
        server_message::join_errors, ClientMessage, ConnectionOptions, NextPayload,
        ServerMessage, SubscribePayload, SubscriptionInfo,
    },
    timeouts::MythicLinkTimeouts,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::tungstenite::protocol::Message;

fn snapshot_subscriptions(subs: &HashMap<String, SubEntry>) -> Vec<SubscriptionInfo> {
    let mut infos: Vec<SubscriptionInfo> = subs
        .iter()
        .map(|(id, entry)| SubscriptionInfo {
            id: id.clone(),
            operation_name: entry.payload.operation_name.clone(),
            created_at_ms: entry.created_at_ms,
            last_event_time_ms: entry.last_event_time_ms,
            events_routed: entry.events_routed,
        })
        .collect();
    infos.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms).then_with(|| a.id.cmp(&b.id)));
    infos
}

// ── Commands ────────────────────────────────────────────────────────────────

enum ConnCmd {
    Subscribe {
        id: String,
        payload: SubscribePayload,
        push_tx: mpsc::Sender<PushMessage>,
        result_tx: oneshot::Sender<Result<()>>,
    },
    Unsubscribe {
        id: String,
    },
    ListSubscriptions {
        result_tx: oneshot::Sender<Vec<SubscriptionInfo>>,
    },
    Shutdown,
}

// ── Per-subscription state ──────────────────────────────────────────────────

struct SubEntry {
    payload: SubscribePayload,
    push_tx: mpsc::Sender<PushMessage>,
    created_at_ms: u64,
    last_event_time_ms: Option<u64>,
    events_routed: u64,
}

impl SubEntry {
    fn new(payload: SubscribePayload, push_tx: mpsc::Sender<PushMessage>) -> Self {
        Self {
            payload,
            push_tx,
            created_at_ms: now_ms(),
            last_event_time_ms: None,
            events_routed: 0,
        }
    }
}

// ── SharedConnection (public handle) ────────────────────────────────────────

pub struct SharedConnection {
    cmd_tx: mpsc::Sender<ConnCmd>,
    connected: Arc<AtomicBool>,
    routing_capacity: usize,
    subscribe_timeout: Duration,
    _task: JoinHandle<()>,
}

impl SharedConnection {
    /// Spawn the connection task and wait for the first connection attempt.
    ///
    /// A failed first attempt is not an error: the task keeps reconnecting
    /// in the background (when enabled) and subscriptions issued meanwhile
    /// are queued until a socket is acknowledged.
    pub async fn connect(
        ws_url: String,
        skip_tls_verify: bool,
        connection_params: Value,
        timeouts: MythicLinkTimeouts,
        connection_options: ConnectionOptions,
        event_handlers: EventHandlers,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ConnCmd>(256);
        let connected = Arc::new(AtomicBool::new(false));
        let routing_capacity = connection_options.routing_channel_capacity.max(1);
        let subscribe_timeout = timeouts.subscribe_timeout;

        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        let task = tokio::spawn(connection_task(
            cmd_rx,
            ConnectionTarget {
                ws_url,
                skip_tls_verify,
                connection_params,
            },
            timeouts,
            connection_options,
            event_handlers,
            connected.clone(),
            ready_tx,
        ));

        match ready_rx.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                log::warn!("[mythic-link] Initial shared connection failed: {}", e);
            },
            Err(_) => {
                log::warn!("[mythic-link] Connection task exited before signalling readiness");
            },
        }

        Ok(Self {
            cmd_tx,
            connected,
            routing_capacity,
            subscribe_timeout,
            _task: task,
        })
    }

    fn task_gone() -> MythicLinkError {
        MythicLinkError::WebSocketError("Connection task is not running".to_string())
    }
}

#[async_trait]
impl SubscriptionTransport for SharedConnection {
    async fn subscribe(&self, id: &str, payload: SubscribePayload) -> Result<PushReceiver> {
        let (push_tx, push_rx) = mpsc::channel(self.routing_capacity);
        let (result_tx, result_rx) = oneshot::channel();

        self.cmd_tx
            .send(ConnCmd::Subscribe {
                id: id.to_string(),
                payload,
                push_tx,
                result_tx,
            })
            .await
            .map_err(|_| Self::task_gone())?;

        let confirmed = if MythicLinkTimeouts::is_no_timeout(self.subscribe_timeout) {
            result_rx.await
        } else {
            tokio::time::timeout(self.subscribe_timeout, result_rx)
                .await
                .map_err(|_| {
                    MythicLinkError::TimeoutError(format!(
                        "Subscribe not confirmed within {:?}",
                        self.subscribe_timeout
                    ))
                })?
        };
        confirmed.map_err(|_| {
            MythicLinkError::WebSocketError(
                "Connection task died before confirming subscribe".to_string(),
            )
        })??;

        Ok(push_rx)
    }

    async fn unsubscribe(&self, id: &str) -> Result<()> {
        self.cmd_tx
            .send(ConnCmd::Unsubscribe { id: id.to_string() })
            .await
            .map_err(|_| Self::task_gone())
    }

    fn release(&self, id: &str) {
        if self.cmd_tx.try_send(ConnCmd::Unsubscribe { id: id.to_string() }).is_err() {
            log::debug!("[mythic-link] Could not queue release of '{}'", id);
        }
    }

    async fn list_subscriptions(&self) -> Vec<SubscriptionInfo> {
        let (result_tx, result_rx) = oneshot::channel();
        if self.cmd_tx.send(ConnCmd::ListSubscriptions { result_tx }).await.is_err() {
            return Vec::new();
        }
        result_rx.await.unwrap_or_default()
    }

    async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ConnCmd::Shutdown).await;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for SharedConnection {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(ConnCmd::Shutdown);
    }
}

// ── Background connection task ──────────────────────────────────────────────

struct ConnectionTarget {
    ws_url: String,
    skip_tls_verify: bool,
    connection_params: Value,
}

async fn establish_ws(
    target: &ConnectionTarget,
    timeouts: &MythicLinkTimeouts,
    event_handlers: &EventHandlers,
) -> Result<WebSocketStream> {
    log::debug!("[mythic-link] Establishing WebSocket connection to {}", target.ws_url);

    let connect = connect_ws(&target.ws_url, target.skip_tls_verify);
    let connect_result = if MythicLinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
        Ok(connect.await)
    } else {
        tokio::time::timeout(timeouts.connection_timeout, connect).await
    };

    let mut ws_stream = match connect_result {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => return Err(upgrade_error(e)),
        Err(_) => {
            return Err(MythicLinkError::TimeoutError(format!(
                "Connection timeout ({:?})",
                timeouts.connection_timeout
            )));
        },
    };

    send_init_and_wait_ack(
        &mut ws_stream,
        &target.connection_params,
        timeouts.ack_timeout,
        event_handlers,
    )
    .await?;
    log::info!("[mythic-link] GraphQL WebSocket connection acknowledged");

    Ok(ws_stream)
}

/// Report a connection error through the handlers and the error policy.
fn report_error(event_handlers: &EventHandlers, error: &MythicLinkError) -> ErrorDisposition {
    event_handlers.emit_error(ConnectionError::new(error.to_string(), !error.is_auth_error()))
}

async fn send_subscribe(
    ws: &mut WebSocketStream,
    id: &str,
    payload: &SubscribePayload,
    event_handlers: &EventHandlers,
) -> Result<()> {
    let msg = ClientMessage::Subscribe {
        id: id.to_string(),
        payload: payload.clone(),
    };
    send_client_message(ws, &msg, event_handlers).await
}

async fn send_complete(
    ws: &mut WebSocketStream,
    id: &str,
    event_handlers: &EventHandlers,
) -> Result<()> {
    send_client_message(ws, &ClientMessage::Complete { id: id.to_string() }, event_handlers).await
}

/// Turn a `next` payload into the message routed to the subscription.
fn next_push_message(payload: Value) -> PushMessage {
    match serde_json::from_value::<NextPayload>(payload) {
        Ok(next) if !next.errors.is_empty() => PushMessage::Error(join_errors(&next.errors)),
        Ok(next) => PushMessage::Data(next.data),
        Err(e) => PushMessage::Error(format!("malformed next payload: {}", e)),
    }
}

/// Route one message to its subscription.
///
/// Returns `false` when the receiver is gone; the entry has then been
/// removed and the server should be told to stop.
async fn deliver(subs: &mut HashMap<String, SubEntry>, id: &str, message: PushMessage) -> bool {
    let Some(entry) = subs.get_mut(id) else {
        log::debug!("[mythic-link] No subscription found for id: {}", id);
        return true;
    };
    entry.last_event_time_ms = Some(now_ms());
    entry.events_routed += 1;
    if entry.push_tx.send(message).await.is_err() {
        log::debug!("[mythic-link] Subscription {} receiver dropped", id);
        subs.remove(id);
        return false;
    }
    true
}

async fn route_message(
    message: ServerMessage,
    ws: &mut WebSocketStream,
    subs: &mut HashMap<String, SubEntry>,
    event_handlers: &EventHandlers,
) -> ErrorDisposition {
    match message {
        ServerMessage::Next { id, payload } => {
            if !deliver(subs, &id, next_push_message(payload)).await {
                let _ = send_complete(ws, &id, event_handlers).await;
            }
        },
        ServerMessage::Error { id, payload } => {
            if let Some(entry) = subs.remove(&id) {
                log::warn!(
                    "[mythic-link] Subscription {} rejected by server: {}",
                    id,
                    join_errors(&payload)
                );
                let _ = entry.push_tx.send(PushMessage::Error(join_errors(&payload))).await;
                let _ = entry.push_tx.send(PushMessage::Complete).await;
            }
        },
        ServerMessage::Complete { id } => {
            if let Some(entry) = subs.remove(&id) {
                log::debug!("[mythic-link] Server completed subscription {}", id);
                let _ = entry.push_tx.send(PushMessage::Complete).await;
            }
        },
        ServerMessage::Ping { .. } => {
            let pong = ClientMessage::Pong { payload: None };
            if let Err(e) = send_client_message(ws, &pong, event_handlers).await {
                log::warn!("[mythic-link] Failed to answer ping: {}", e);
            }
        },
        ServerMessage::Pong { .. } | ServerMessage::ConnectionAck { .. } => {},
        ServerMessage::ConnectionError { payload } => {
            let err = MythicLinkError::WebSocketError(format!(
                "Server reported connection error: {}",
                payload.map(|p| p.to_string()).unwrap_or_default()
            ));
            return report_error(event_handlers, &err);
        },
    }
    ErrorDisposition::Continue
}

async fn resubscribe_all(
    ws: &mut WebSocketStream,
    subs: &HashMap<String, SubEntry>,
    event_handlers: &EventHandlers,
) {
    log::info!(
        "[mythic-link] Re-subscribing {} active subscription(s) after reconnect",
        subs.len()
    );
    for (id, entry) in subs.iter() {
        if let Err(e) = send_subscribe(ws, id, &entry.payload, event_handlers).await {
            log::warn!("[mythic-link] Failed to re-subscribe {}: {}", id, e);
            report_error(event_handlers, &e);
        }
    }
}

/// Fail every live subscription; their pumps see the error, then the end of
/// the stream.
fn fail_all(subs: &mut HashMap<String, SubEntry>, reason: &str) {
    for (_id, entry) in subs.drain() {
        let _ = entry.push_tx.try_send(PushMessage::Error(reason.to_string()));
    }
}

/// Serve commands while no socket can be obtained. Returns on shutdown.
async fn serve_offline(
    cmd_rx: &mut mpsc::Receiver<ConnCmd>,
    subs: &mut HashMap<String, SubEntry>,
    reason: &str,
) {
    fail_all(subs, reason);
    loop {
        match cmd_rx.recv().await {
            Some(ConnCmd::Subscribe { result_tx, .. }) => {
                let _ = result_tx.send(Err(MythicLinkError::WebSocketError(reason.to_string())));
            },
            Some(ConnCmd::Unsubscribe { id }) => {
                subs.remove(&id);
            },
            Some(ConnCmd::ListSubscriptions { result_tx }) => {
                let _ = result_tx.send(snapshot_subscriptions(subs));
            },
            Some(ConnCmd::Shutdown) | None => return,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn connection_task(
    mut cmd_rx: mpsc::Receiver<ConnCmd>,
    target: ConnectionTarget,
    timeouts: MythicLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    connected: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let mut subs: HashMap<String, SubEntry> = HashMap::new();
    let mut ws_stream: Option<WebSocketStream> = None;
    let mut shutdown_requested = false;
    let mut stop_reconnecting = false;
    let mut reconnect_attempts: u32 = 0;

    let has_keepalive = !timeouts.keepalive_interval.is_zero();
    let keepalive_dur = if has_keepalive {
        timeouts.keepalive_interval
    } else {
        FAR_FUTURE
    };
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    let pong_timeout_dur = timeouts.pong_timeout;
    let has_pong_timeout = has_keepalive && !pong_timeout_dur.is_zero();
    let mut awaiting_pong = false;
    let mut pong_deadline = TokioInstant::now() + FAR_FUTURE;

    match establish_ws(&target, &timeouts, &event_handlers).await {
        Ok(stream) => {
            ws_stream = Some(stream);
            connected.store(true, Ordering::SeqCst);
            event_handlers.emit_connect();
            idle_deadline = TokioInstant::now() + keepalive_dur;
            let _ = ready_tx.send(Ok(()));
        },
        Err(e) => {
            if report_error(&event_handlers, &e) == ErrorDisposition::StopReconnecting {
                stop_reconnecting = true;
            }
            let _ = ready_tx.send(Err(e));
        },
    }

    loop {
        if shutdown_requested {
            if let Some(ref mut ws) = ws_stream {
                for id in subs.keys() {
                    let _ = send_complete(ws, id, &event_handlers).await;
                }
                let _ = ws.close(None).await;
            }
            // Dropping the senders ends every pump.
            subs.clear();
            if connected.swap(false, Ordering::SeqCst) {
                event_handlers.emit_disconnect(DisconnectReason::new("Client disconnected"));
            }
            return;
        }

        if let Some(ref mut ws) = ws_stream {
            let idle_sleep = tokio::time::sleep_until(idle_deadline);
            tokio::pin!(idle_sleep);

            let pong_sleep = tokio::time::sleep_until(pong_deadline);
            tokio::pin!(pong_sleep);

            tokio::select! {
                biased;

                _ = &mut pong_sleep, if has_pong_timeout && awaiting_pong => {
                    log::warn!(
                        "[mythic-link] Pong timeout ({:?}), server unresponsive",
                        pong_timeout_dur,
                    );
                    event_handlers.emit_disconnect(DisconnectReason::new(format!(
                        "Pong timeout ({:?})",
                        pong_timeout_dur,
                    )));
                    connected.store(false, Ordering::SeqCst);
                    awaiting_pong = false;
                    ws_stream = None;
                    continue;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnCmd::Subscribe { id, payload, push_tx, result_tx }) => {
                            if subs.remove(&id).is_some() {
                                log::debug!("[mythic-link] Replacing existing subscription '{}'", id);
                                let _ = send_complete(ws, &id, &event_handlers).await;
                            }
                            if push_tx.is_closed() {
                                log::debug!("[mythic-link] Subscribe '{}' abandoned by caller", id);
                                continue;
                            }
                            if let Err(e) = send_subscribe(ws, &id, &payload, &event_handlers).await {
                                let _ = result_tx.send(Err(MythicLinkError::SubscriptionFailed(
                                    format!("'{}': {}", id, e),
                                )));
                                continue;
                            }
                            if result_tx.send(Ok(())).is_err() {
                                // Caller timed out after the frame went out.
                                log::debug!("[mythic-link] Subscribe '{}' abandoned by caller", id);
                                let _ = send_complete(ws, &id, &event_handlers).await;
                                continue;
                            }
                            log::debug!("[mythic-link] Subscribed '{}'", id);
                            subs.insert(id, SubEntry::new(payload, push_tx));
                        },
                        Some(ConnCmd::Unsubscribe { id }) => {
                            if subs.remove(&id).is_some() {
                                log::debug!("[mythic-link] Unsubscribed '{}'", id);
                                let _ = send_complete(ws, &id, &event_handlers).await;
                            }
                        },
                        Some(ConnCmd::ListSubscriptions { result_tx }) => {
                            let _ = result_tx.send(snapshot_subscriptions(&subs));
                        },
                        Some(ConnCmd::Shutdown) | None => {
                            shutdown_requested = true;
                            continue;
                        },
                    }
                }

                _ = &mut idle_sleep, if has_keepalive && !awaiting_pong => {
                    if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                        log::warn!("[mythic-link] Keepalive ping failed: {}", e);
                        event_handlers.emit_disconnect(DisconnectReason::new(format!(
                            "Keepalive ping failed: {}", e
                        )));
                        connected.store(false, Ordering::SeqCst);
                        awaiting_pong = false;
                        ws_stream = None;
                        continue;
                    }
                    if has_pong_timeout {
                        awaiting_pong = true;
                        pong_deadline = TokioInstant::now() + pong_timeout_dur;
                    }
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                }

                frame = ws.next() => {
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                    if awaiting_pong {
                        awaiting_pong = false;
                        pong_deadline = TokioInstant::now() + FAR_FUTURE;
                    }

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if text.len() > MAX_WS_TEXT_MESSAGE_BYTES {
                                log::warn!("[mythic-link] Text message too large ({} bytes)", text.len());
                                continue;
                            }
                            event_handlers.emit_receive(&text);
                            let disposition = match serde_json::from_str::<ServerMessage>(&text) {
                                Ok(message) => {
                                    route_message(message, ws, &mut subs, &event_handlers).await
                                },
                                Err(e) => report_error(
                                    &event_handlers,
                                    &MythicLinkError::SerializationError(format!(
                                        "Failed to parse server message: {}", e
                                    )),
                                ),
                            };
                            if disposition == ErrorDisposition::StopReconnecting {
                                stop_reconnecting = true;
                            }
                        },
                        Some(Ok(Message::Binary(_))) => {
                            log::debug!("[mythic-link] Ignoring binary frame");
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = match frame {
                                Some(f) => DisconnectReason::with_code(f.reason.as_str(), f.code.into()),
                                None => DisconnectReason::new("Server closed connection"),
                            };
                            event_handlers.emit_disconnect(reason);
                            connected.store(false, Ordering::SeqCst);
                            ws_stream = None;
                            continue;
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        },
                        Some(Ok(Message::Pong(_))) => {
                            log::debug!("[mythic-link] Keepalive: received Pong");
                        },
                        Some(Ok(Message::Frame(_))) => {},
                        Some(Err(e)) => {
                            let err = MythicLinkError::WebSocketError(e.to_string());
                            if report_error(&event_handlers, &err) == ErrorDisposition::StopReconnecting {
                                stop_reconnecting = true;
                            }
                            event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                "WebSocket error: {}", e
                            )));
                            connected.store(false, Ordering::SeqCst);
                            ws_stream = None;
                            continue;
                        },
                        None => {
                            event_handlers.emit_disconnect(DisconnectReason::new("WebSocket stream ended"));
                            connected.store(false, Ordering::SeqCst);
                            ws_stream = None;
                            continue;
                        },
                    }
                }
            }
        } else {
            // ── Not connected: reconnect or refuse ──────────────────────
            if !connection_options.auto_reconnect || stop_reconnecting {
                serve_offline(&mut cmd_rx, &mut subs, "Not connected and reconnection is disabled")
                    .await;
                return;
            }

            let attempt = reconnect_attempts;
            reconnect_attempts = reconnect_attempts.saturating_add(1);
            if let Some(max) = connection_options.max_reconnect_attempts {
                if attempt >= max {
                    log::warn!("[mythic-link] Max reconnection attempts ({}) reached", max);
                    event_handlers.emit_error(ConnectionError::new(
                        format!("Max reconnection attempts ({}) reached", max),
                        false,
                    ));
                    serve_offline(&mut cmd_rx, &mut subs, "Max reconnection attempts reached")
                        .await;
                    return;
                }
            }

            let delay = connection_options.reconnect_delay_for(attempt);
            log::info!(
                "[mythic-link] Attempting reconnection in {}ms (attempt {})",
                delay,
                attempt + 1
            );

            let sleep_fut = tokio::time::sleep(Duration::from_millis(delay));
            tokio::pin!(sleep_fut);

            // Commands arriving while disconnected are queued and re-sent by
            // `resubscribe_all` once a socket is acknowledged.
            loop {
                tokio::select! {
                    biased;
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(ConnCmd::Subscribe { id, payload, push_tx, result_tx }) => {
                                if !push_tx.is_closed() && result_tx.send(Ok(())).is_ok() {
                                    subs.insert(id, SubEntry::new(payload, push_tx));
                                }
                            },
                            Some(ConnCmd::Unsubscribe { id }) => {
                                subs.remove(&id);
                            },
                            Some(ConnCmd::ListSubscriptions { result_tx }) => {
                                let _ = result_tx.send(snapshot_subscriptions(&subs));
                            },
                            Some(ConnCmd::Shutdown) | None => {
                                shutdown_requested = true;
                                break;
                            },
                        }
                    }
                    _ = &mut sleep_fut => { break; }
                }
            }

            if shutdown_requested {
                continue;
            }

            match establish_ws(&target, &timeouts, &event_handlers).await {
                Ok(mut stream) => {
                    log::info!("[mythic-link] Reconnection successful");
                    reconnect_attempts = 0;
                    connected.store(true, Ordering::SeqCst);
                    event_handlers.emit_connect();
                    resubscribe_all(&mut stream, &subs, &event_handlers).await;
                    ws_stream = Some(stream);
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                    awaiting_pong = false;
                    pong_deadline = TokioInstant::now() + FAR_FUTURE;
                },
                Err(e) => {
                    log::warn!("[mythic-link] Reconnection attempt {} failed: {}", attempt + 1, e);
                    if report_error(&event_handlers, &e) == ErrorDisposition::StopReconnecting {
                        stop_reconnecting = true;
                    }
                },
            }
        }
    }
}
