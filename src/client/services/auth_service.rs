use crate::client::services::api_client::ApiClient;
use crate::common::error::ApiError;
use crate::common::models::{AuthResponse, Credentials, RegisterProfile, UserSummary};

const KIND: &str = "account";

/// `/auth/*` endpoints.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, ApiError> {
        self.api.post(KIND, "/auth/register", profile).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.api.post(KIND, "/auth/login", credentials).await
    }

    /// Who the backend thinks the current token belongs to.
    pub async fn me(&self) -> Result<UserSummary, ApiError> {
        let value: serde_json::Value = self.api.get(KIND, "/auth/me").await?;
        // Some deployments wrap the user as {"user": {...}}
        let user = match value.get("user") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => value,
        };
        serde_json::from_value(user).map_err(|e| ApiError::Decode(format!("{} response: {}", KIND, e)))
    }
}
