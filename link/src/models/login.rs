use serde::{Deserialize, Serialize};

/// Body of `POST /auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response of `/auth` and `/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// JWT access token for subsequent API calls.
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUserInfo>,
}

/// Operator information returned on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    /// Operation the operator currently has selected; `0` means none.
    #[serde(default)]
    pub current_operation_id: Option<i64>,
    #[serde(default)]
    pub current_operation: Option<String>,
}
