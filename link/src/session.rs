//! Shared session state: credentials and the current operation.
//!
//! A [`Session`] is cheap to clone; every clone sees the same state. The
//! client updates it on login/logout and the subscription coordinator reads
//! it when a subscription starts.

use crate::auth::AuthProvider;
use crate::models::LoginResponse;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct SessionState {
    api_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    current_operation: Option<i64>,
    user_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_credentials(
        api_token: Option<String>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        let session = Self::new();
        {
            let mut state = session.state.write();
            state.api_token = api_token.filter(|t| !t.is_empty());
            state.access_token = access_token.filter(|t| !t.is_empty());
            state.refresh_token = refresh_token.filter(|t| !t.is_empty());
        }
        session
    }

    /// Credential used for requests; the API token wins over an access token.
    pub fn auth(&self) -> AuthProvider {
        let state = self.state.read();
        if let Some(token) = &state.api_token {
            AuthProvider::api_token(token.clone())
        } else if let Some(token) = &state.access_token {
            AuthProvider::access_token(token.clone())
        } else {
            AuthProvider::none()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth().is_authenticated()
    }

    /// `connection_init` payload for the shared WebSocket connection.
    pub fn connection_params(&self) -> serde_json::Value {
        self.auth().connection_params()
    }

    pub fn set_api_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.state.write().api_token = (!token.is_empty()).then_some(token);
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    pub fn current_operation(&self) -> Option<i64> {
        self.state.read().current_operation
    }

    /// Set the operation subscriptions fall back to. `0` clears it.
    pub fn set_current_operation(&self, operation_id: i64) {
        self.state.write().current_operation = (operation_id != 0).then_some(operation_id);
    }

    pub fn user_id(&self) -> Option<i64> {
        self.state.read().user_id
    }

    /// Store the tokens and operation returned by `/auth` or `/refresh`.
    ///
    /// A response without an operation keeps the current one.
    pub(crate) fn apply_login(&self, response: &LoginResponse) {
        let mut state = self.state.write();
        state.access_token = Some(response.access_token.clone());
        if let Some(refresh) = &response.refresh_token {
            state.refresh_token = Some(refresh.clone());
        }
        if let Some(user) = &response.user {
            state.user_id = Some(user.id);
            if let Some(op) = user.current_operation_id.filter(|op| *op != 0) {
                state.current_operation = Some(op);
            }
        }
    }

    /// Drop every credential and the current operation.
    pub fn clear(&self) {
        *self.state.write() = SessionState::default();
    }
}
