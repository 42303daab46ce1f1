//! Low-level WebSocket helpers: endpoint resolution, the upgrade request,
//! TLS setup and the `connection_init` / `connection_ack` handshake.

use crate::{
    error::{MythicLinkError, Result},
    event_handlers::EventHandlers,
    models::{ClientMessage, ServerMessage},
};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::{
    connect_async_tls_with_config,
    tungstenite::{
        client::IntoClientRequest,
        error::Error as WsError,
        handshake::client::Response as WsResponse,
        http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL},
        protocol::Message,
    },
    Connector,
};

pub(crate) type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

/// Subprotocol Mythic's GraphQL endpoint speaks.
pub const GRAPHQL_TRANSPORT_WS_PROTOCOL: &str = "graphql-transport-ws";

/// Close code the server uses to reject `connection_init`.
const CLOSE_CODE_FORBIDDEN: u16 = 4403;

/// HTTP and WebSocket endpoints derived from the configured server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `http(s)://host[:port][/prefix]`, no trailing slash.
    pub http_base: String,
    /// `ws(s)://host[:port][/prefix]/graphql/`.
    pub ws_url: String,
}

impl Endpoints {
    pub fn http_url(&self, path: &str) -> String {
        format!("{}/{}", self.http_base, path.trim_start_matches('/'))
    }
}

/// Resolve endpoints from a server URL.
///
/// Any `http(s)://` or `ws(s)://` prefix is dropped; the `ssl` flag alone
/// picks the scheme.
pub fn resolve_endpoints(server_url: &str, ssl: bool) -> Result<Endpoints> {
    let trimmed = server_url.trim();
    if trimmed.is_empty() {
        return Err(MythicLinkError::ConfigurationError(
            "server_url cannot be empty".to_string(),
        ));
    }

    let without_scheme = match trimmed.split_once("://") {
        Some(("http" | "https" | "ws" | "wss", rest)) => rest,
        Some((other, _)) => {
            return Err(MythicLinkError::ConfigurationError(format!(
                "Unsupported server_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
        None => trimmed,
    };

    let (http_scheme, ws_scheme) = if ssl { ("https", "wss") } else { ("http", "ws") };
    let url = Url::parse(&format!("{}://{}", http_scheme, without_scheme)).map_err(|e| {
        MythicLinkError::ConfigurationError(format!("Invalid server_url '{}': {}", server_url, e))
    })?;
    validate_server_url(&url)?;

    let host = url.host_str().unwrap_or_default();
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let prefix = url.path().trim_end_matches('/');

    Ok(Endpoints {
        http_base: format!("{}://{}{}", http_scheme, authority, prefix),
        ws_url: format!("{}://{}{}/graphql/", ws_scheme, authority, prefix),
    })
}

fn validate_server_url(url: &Url) -> Result<()> {
    if url.host_str().map_or(true, str::is_empty) {
        return Err(MythicLinkError::ConfigurationError(
            "server_url must include a host".to_string(),
        ));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(MythicLinkError::ConfigurationError(
            "server_url must not include username/password credentials".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(MythicLinkError::ConfigurationError(
            "server_url must not include query parameters or fragments".to_string(),
        ));
    }
    Ok(())
}

/// TLS connector for `wss://` URLs. `None` uses the platform defaults.
fn tls_connector(ws_url: &str, skip_tls_verify: bool) -> Result<Option<Connector>> {
    if !skip_tls_verify || !ws_url.starts_with("wss://") {
        return Ok(None);
    }
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| {
            MythicLinkError::ConfigurationError(format!("Failed to build TLS connector: {}", e))
        })?;
    Ok(Some(Connector::NativeTls(tls)))
}

/// Open the socket and complete the WebSocket upgrade.
pub(crate) async fn connect_ws(
    ws_url: &str,
    skip_tls_verify: bool,
) -> std::result::Result<(WebSocketStream, WsResponse), WsError> {
    let mut request = ws_url.into_client_request()?;
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(GRAPHQL_TRANSPORT_WS_PROTOCOL),
    );
    let connector = tls_connector(ws_url, skip_tls_verify)
        .map_err(|e| WsError::Io(std::io::Error::other(e.to_string())))?;
    connect_async_tls_with_config(request, None, true, connector).await
}

/// Map a failed upgrade to a client error.
pub(crate) fn upgrade_error(err: WsError) -> MythicLinkError {
    match err {
        WsError::Http(response) => {
            let status = response.status();
            let body_text = response
                .into_body()
                .as_ref()
                .filter(|b| !b.is_empty())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            match status.as_u16() {
                401 => MythicLinkError::AuthenticationError(
                    "Unauthorized: GraphQL WebSocket requires valid credentials".to_string(),
                ),
                403 => MythicLinkError::AuthenticationError(
                    "Forbidden: access to GraphQL WebSocket denied".to_string(),
                ),
                code if body_text.is_empty() => {
                    MythicLinkError::WebSocketError(format!("WebSocket HTTP error: {}", code))
                },
                code => MythicLinkError::WebSocketError(format!(
                    "WebSocket HTTP error {}: {}",
                    code, body_text
                )),
            }
        },
        other => MythicLinkError::WebSocketError(format!("Connection failed: {}", other)),
    }
}

/// Serialize and send one protocol message.
pub(crate) async fn send_client_message(
    ws: &mut WebSocketStream,
    message: &ClientMessage,
    event_handlers: &EventHandlers,
) -> Result<()> {
    let payload = serde_json::to_string(message)?;
    event_handlers.emit_send(&payload);
    ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| MythicLinkError::WebSocketError(format!("Failed to send message: {}", e)))
}

/// Send `connection_init` and wait for `connection_ack`.
///
/// Pings received during the handshake are answered; other frames are
/// ignored until the ack arrives or `ack_timeout` elapses.
pub(crate) async fn send_init_and_wait_ack(
    ws: &mut WebSocketStream,
    connection_params: &Value,
    ack_timeout: Duration,
    event_handlers: &EventHandlers,
) -> Result<()> {
    let init = ClientMessage::ConnectionInit {
        payload: Some(connection_params.clone()),
    };
    send_client_message(ws, &init, event_handlers).await?;

    let timeout_err =
        || MythicLinkError::TimeoutError(format!("connection_ack timeout ({:?})", ack_timeout));
    let deadline = TokioInstant::now() + ack_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(TokioInstant::now());
        if remaining.is_zero() {
            return Err(timeout_err());
        }

        match tokio::time::timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                event_handlers.emit_receive(&text);
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::ConnectionAck { .. }) => return Ok(()),
                    Ok(ServerMessage::ConnectionError { payload }) => {
                        return Err(MythicLinkError::AuthenticationError(format!(
                            "connection_init rejected: {}",
                            payload.map(|p| p.to_string()).unwrap_or_default()
                        )));
                    },
                    Ok(ServerMessage::Ping { .. }) => {
                        send_client_message(ws, &ClientMessage::Pong { payload: None }, event_handlers)
                            .await?;
                    },
                    Ok(_) => continue,
                    Err(e) => {
                        return Err(MythicLinkError::WebSocketError(format!(
                            "Failed to parse handshake message: {}",
                            e
                        )));
                    },
                }
            },
            Ok(Some(Ok(Message::Ping(payload)))) => {
                let _ = ws.send(Message::Pong(payload)).await;
            },
            Ok(Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_)))) => continue,
            Ok(Some(Ok(Message::Close(frame)))) => {
                return Err(match frame {
                    Some(f) if u16::from(f.code) == CLOSE_CODE_FORBIDDEN => {
                        MythicLinkError::AuthenticationError(format!(
                            "connection_init rejected: {}",
                            f.reason.as_str()
                        ))
                    },
                    Some(f) => MythicLinkError::WebSocketError(format!(
                        "Connection closed during handshake: {} (code: {})",
                        f.reason.as_str(),
                        u16::from(f.code)
                    )),
                    None => MythicLinkError::WebSocketError(
                        "Connection closed during handshake".to_string(),
                    ),
                });
            },
            Ok(Some(Err(e))) => {
                return Err(MythicLinkError::WebSocketError(format!(
                    "WebSocket error during handshake: {}",
                    e
                )));
            },
            Ok(None) => {
                return Err(MythicLinkError::WebSocketError(
                    "Connection closed before connection_ack".to_string(),
                ));
            },
            Err(_) => return Err(timeout_err()),
        }
    }
}
