//! Auth client and session plumbing shared across clients.

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::ResponseStatus;

/// Bearer credential issued by the backend on login/registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredential {
    pub token: String,
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Durable storage for the signed-in credential.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthCredential>>;
    fn save_session(&self, credential: &AuthCredential) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Read side of the session store, consulted per outbound request.
/// A missing token means the request goes out without an Authorization
/// header and the server answers `UNAUTHORIZED`.
pub trait TokenProvider: Send + Sync + 'static {
    fn token(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    status: ResponseStatus,
    message: Option<String>,
    token: Option<String>,
}

/// REST client for the register/login endpoints.
#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    client: Client,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> AuthResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: Client::builder().build()?,
        })
    }

    /// Register a new user and obtain a bearer credential.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthCredential> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(&payload)
            .send()
            .await?
            .json::<AuthResponse>()
            .await?;

        into_credential(response)
    }

    /// Exchange email/password for a bearer credential.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AuthCredential> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&payload)
            .send()
            .await?
            .json::<AuthResponse>()
            .await?;

        into_credential(response)
    }
}

fn into_credential(response: AuthResponse) -> AuthResult<AuthCredential> {
    match response.status {
        ResponseStatus::Success => {
            let token = response
                .token
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| {
                    AuthError::Api("response did not include an auth token".to_string())
                })?;
            Ok(AuthCredential { token })
        }
        _ => Err(AuthError::Api(
            response
                .message
                .unwrap_or_else(|| "Something went wrong!".to_string()),
        )),
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::InvalidConfiguration("email must not be empty"));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "password must not be empty",
        ));
    }
    Ok(())
}

fn normalize_base_url(raw: String) -> AuthResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "base URL must not be empty",
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(AuthError::InvalidConfiguration(
            "base URL must include http:// or https://",
        ))
    }
}
