//! Authentication material for Mythic.
//!
//! Mythic accepts either a long-lived API token (`apitoken` header) or a JWT
//! access token obtained from `/auth` (`Authorization: Bearer`). The same
//! headers are used for HTTP requests and, wrapped in a `headers` object, as
//! the WebSocket `connection_init` payload.

use serde_json::{json, Map, Value};

/// Header name Mythic reads API tokens from.
pub const API_TOKEN_HEADER: &str = "apitoken";

/// Authentication credentials for a Mythic server.
///
/// # Examples
///
/// ```rust
/// use mythic_link::AuthProvider;
///
/// let auth = AuthProvider::api_token("eyJhbGc...");
/// assert!(auth.is_authenticated());
///
/// let auth = AuthProvider::none();
/// assert!(!auth.is_authenticated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProvider {
    /// API token, sent as the `apitoken` header. Preferred when present.
    ApiToken(String),

    /// JWT access token from a username/password login.
    AccessToken(String),

    /// No credentials.
    None,
}

impl AuthProvider {
    pub fn api_token(token: impl Into<String>) -> Self {
        Self::ApiToken(token.into())
    }

    pub fn access_token(token: impl Into<String>) -> Self {
        Self::AccessToken(token.into())
    }

    pub fn none() -> Self {
        Self::None
    }

    /// Check if a non-empty credential is configured.
    pub fn is_authenticated(&self) -> bool {
        match self {
            Self::ApiToken(token) | Self::AccessToken(token) => !token.is_empty(),
            Self::None => false,
        }
    }

    /// Header name/value pair for this credential, if any.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Self::ApiToken(token) if !token.is_empty() => Some((API_TOKEN_HEADER, token.clone())),
            Self::AccessToken(token) if !token.is_empty() => {
                Some(("Authorization", format!("Bearer {}", token)))
            },
            _ => None,
        }
    }

    /// Payload for the WebSocket `connection_init` message:
    /// `{"headers": {<header>: <value>}}`.
    pub fn connection_params(&self) -> Value {
        let mut headers = Map::new();
        if let Some((name, value)) = self.header() {
            headers.insert(name.to_string(), Value::String(value));
        }
        json!({ "headers": headers })
    }

    /// Attach the credential header to an HTTP request builder.
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.header() {
            Some((name, value)) => request.header(name, value),
            None => request,
        }
    }
}
