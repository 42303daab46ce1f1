//! Main Mythic client with builder pattern.
//!
//! Provides login/refresh against Mythic's REST endpoints and real-time
//! subscriptions multiplexed over one shared GraphQL WebSocket.

use crate::{
    config::ClientConfig,
    connection::{resolve_endpoints, Endpoints, TransportConnector, WebSocketConnector},
    error::{MythicLinkError, Result},
    event_handlers::EventHandlers,
    models::{
        ConnectionOptions, LoginRequest, LoginResponse, RefreshRequest, SubscriptionConfig,
        SubscriptionInfo,
    },
    session::Session,
    subscription::{Subscription, SubscriptionCoordinator, SubscriptionHandle},
    timeouts::MythicLinkTimeouts,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

struct ClientInner {
    endpoints: Endpoints,
    http_client: reqwest::Client,
    session: Session,
    credentials: Option<(String, String)>,
    coordinator: SubscriptionCoordinator,
    timeouts: MythicLinkTimeouts,
}

/// Mythic client.
///
/// Cheap to clone; clones share the session, the shared connection and
/// every subscription. Use [`MythicClientBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use mythic_link::{MythicClient, SubscriptionConfig, SubscriptionKind};
///
/// # async fn example() -> mythic_link::Result<()> {
/// let client = MythicClient::builder()
///     .server_url("mythic.example.com:7443")
///     .api_token("eyJhbGc...")
///     .current_operation(1)
///     .build()?;
///
/// let config = SubscriptionConfig::new(SubscriptionKind::Callback, |event| {
///     println!("{}", event);
///     Ok(())
/// });
/// let mut subscription = client.subscribe(config).await?;
///
/// while let Some(item) = subscription.next().await {
///     match item {
///         Ok(event) => println!("new callback rows: {}", event.rows().len()),
///         Err(e) => eprintln!("subscription error: {}", e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MythicClient {
    inner: Arc<ClientInner>,
}

impl MythicClient {
    pub fn builder() -> MythicClientBuilder {
        MythicClientBuilder::new()
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub fn timeouts(&self) -> &MythicLinkTimeouts {
        &self.inner.timeouts
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// Make sure the session holds a credential.
    ///
    /// A configured API token or access token is used as-is. Otherwise the
    /// username and password given to the builder are exchanged at `/auth`.
    pub async fn login(&self) -> Result<()> {
        if self.inner.session.is_authenticated() {
            return Ok(());
        }
        let Some((username, password)) = &self.inner.credentials else {
            return Err(MythicLinkError::AuthenticationError(
                "username and password required".to_string(),
            ));
        };
        self.login_with_credentials(username, password).await.map(|_| ())
    }

    /// Log in at `POST /auth` and store the returned tokens and operation.
    pub async fn login_with_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse> {
        let url = self.inner.endpoints.http_url("/auth");
        log::debug!("[mythic-link] Authenticating user '{}' at url={}", username, url);

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.post_auth_json(&url, &request, false).await?;
        if response.access_token.is_empty() {
            return Err(MythicLinkError::AuthenticationError(
                "login response did not contain an access token".to_string(),
            ));
        }

        self.inner.session.apply_login(&response);
        log::info!(
            "[mythic-link] Logged in as '{}' (operation: {:?})",
            username,
            self.inner.session.current_operation()
        );
        Ok(response)
    }

    /// Exchange the refresh token for a new access token at `POST /refresh`.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let session = &self.inner.session;
        let Some(refresh_token) = session.refresh_token() else {
            return Err(MythicLinkError::AuthenticationError(
                "no refresh token available".to_string(),
            ));
        };
        let request = RefreshRequest {
            access_token: session.access_token().unwrap_or_default(),
            refresh_token,
        };

        let url = self.inner.endpoints.http_url("/refresh");
        let response = self.post_auth_json(&url, &request, true).await?;
        if response.access_token.is_empty() {
            return Err(MythicLinkError::AuthenticationError(
                "no access token returned".to_string(),
            ));
        }
        session.apply_login(&response);
        log::debug!("[mythic-link] Access token refreshed");
        Ok(())
    }

    async fn post_auth_json<T: serde::Serialize>(
        &self,
        url: &str,
        body: &T,
        authenticated: bool,
    ) -> Result<LoginResponse> {
        let mut request = self.inner.http_client.post(url).json(body);
        if authenticated {
            request = self.inner.session.auth().apply_to_request(request);
        }

        let start = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status();
        log::debug!("[mythic-link] POST {} -> {} in {:?}", url, status, start.elapsed());

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MythicLinkError::AuthenticationError(format!(
                "request failed with status {}: {}",
                status.as_u16(),
                error_text
            )));
        }
        Ok(response.json::<LoginResponse>().await?)
    }

    /// Drop every credential and the current operation.
    ///
    /// Tokens are not revoked server-side, and an already established shared
    /// connection keeps the credentials it was opened with.
    pub fn logout(&self) {
        self.inner.session.clear();
    }

    /// Operation used by subscriptions without an explicit operation id.
    pub fn set_current_operation(&self, operation_id: i64) {
        self.inner.session.set_current_operation(operation_id);
    }

    pub fn current_operation(&self) -> Option<i64> {
        self.inner.session.current_operation()
    }

    /// Start a real-time subscription.
    ///
    /// Returns once the server side has accepted it. The first call opens
    /// the shared connection.
    pub async fn subscribe(&self, config: SubscriptionConfig) -> Result<Subscription> {
        self.inner.coordinator.subscribe(config, &CancellationToken::new()).await
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription also ends
    /// when `token` is cancelled.
    pub async fn subscribe_with_token(
        &self,
        config: SubscriptionConfig,
        token: &CancellationToken,
    ) -> Result<Subscription> {
        self.inner.coordinator.subscribe(config, token).await
    }

    /// Stop a subscription. Fails if it is no longer active.
    pub fn unsubscribe(&self, subscription: &SubscriptionHandle) -> Result<()> {
        self.inner.coordinator.unsubscribe(subscription)
    }

    /// Snapshots of the subscriptions carried by the shared connection.
    pub async fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.inner.coordinator.subscriptions().await
    }

    pub fn active_subscription_count(&self) -> usize {
        self.inner.coordinator.active_count()
    }

    /// Whether the shared connection currently has an acknowledged socket.
    pub fn is_connected(&self) -> bool {
        self.inner.coordinator.is_connected()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.coordinator.is_closed()
    }

    /// Cancel every subscription and close the shared connection.
    ///
    /// Idempotent. Later subscribe calls fail with
    /// [`MythicLinkError::ClientClosed`]. Dropping the last clone also
    /// cancels every subscription, without waiting for the socket to close.
    pub async fn close(&self) {
        self.inner.coordinator.close().await;
    }
}

/// Builder for configuring [`MythicClient`] instances.
pub struct MythicClientBuilder {
    server_url: Option<String>,
    ssl: bool,
    skip_tls_verify: bool,
    api_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    credentials: Option<(String, String)>,
    current_operation: Option<i64>,
    timeout: Duration,
    timeouts: MythicLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    transport_connector: Option<Arc<dyn TransportConnector>>,
}

impl MythicClientBuilder {
    fn new() -> Self {
        Self {
            server_url: None,
            ssl: true,
            skip_tls_verify: false,
            api_token: None,
            access_token: None,
            refresh_token: None,
            credentials: None,
            current_operation: None,
            timeout: Duration::from_secs(120),
            timeouts: MythicLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
            transport_connector: None,
        }
    }

    /// Start from a [`ClientConfig`]; later builder calls override it.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::new()
            .server_url(config.server_url.clone())
            .ssl(config.ssl)
            .skip_tls_verify(config.skip_tls_verify)
            .timeout(config.timeout());
        builder.api_token = config.api_token.clone();
        builder.access_token = config.access_token.clone();
        builder.refresh_token = config.refresh_token.clone();
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(username.clone(), password.clone());
        }
        builder
    }

    /// Server address, e.g. `mythic.example.com:7443`.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Use HTTPS/WSS (default) or plain HTTP/WS.
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Accept self-signed or otherwise invalid certificates.
    pub fn skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Username and password used by [`MythicClient::login`].
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn current_operation(mut self, operation_id: i64) -> Self {
        self.current_operation = Some(operation_id);
        self
    }

    /// Set request timeout (for HTTP requests). Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set every timeout at once. Also sets the HTTP request timeout.
    pub fn timeouts(mut self, timeouts: MythicLinkTimeouts) -> Self {
        self.timeout = timeouts.request_timeout;
        self.timeouts = timeouts;
        self
    }

    /// Reconnection and routing behavior of the shared connection.
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Replace the WebSocket transport, e.g. with an in-memory one in tests.
    pub fn transport_connector(mut self, connector: Arc<dyn TransportConnector>) -> Self {
        self.transport_connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<MythicClient> {
        let server_url = self
            .server_url
            .ok_or_else(|| MythicLinkError::ConfigurationError("server_url is required".into()))?;
        let endpoints = resolve_endpoints(&server_url, self.ssl)?;

        let mut http_builder = reqwest::Client::builder()
            .connect_timeout(self.timeouts.connection_timeout)
            .danger_accept_invalid_certs(self.skip_tls_verify);
        if !MythicLinkTimeouts::is_no_timeout(self.timeout) {
            http_builder = http_builder.timeout(self.timeout);
        }
        let http_client = http_builder
            .build()
            .map_err(|e| MythicLinkError::ConfigurationError(e.to_string()))?;

        let session = Session::with_credentials(self.api_token, self.access_token, self.refresh_token);
        if let Some(operation_id) = self.current_operation {
            session.set_current_operation(operation_id);
        }

        let connector: Arc<dyn TransportConnector> = match self.transport_connector {
            Some(connector) => connector,
            None => Arc::new(
                WebSocketConnector::new(endpoints.ws_url.clone())
                    .skip_tls_verify(self.skip_tls_verify)
                    .timeouts(self.timeouts.clone())
                    .connection_options(self.connection_options)
                    .event_handlers(self.event_handlers),
            ),
        };

        log::debug!("[mythic-link] Client built for {}", endpoints.http_base);

        Ok(MythicClient {
            inner: Arc::new(ClientInner {
                coordinator: SubscriptionCoordinator::new(session.clone(), connector),
                endpoints,
                http_client,
                session,
                credentials: self.credentials,
                timeouts: self.timeouts,
            }),
        })
    }
}
