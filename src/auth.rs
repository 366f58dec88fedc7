use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

/// Identity resolved from a bearer token by the external auth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator: maps a bearer token to a session. The flows behind
/// it (sign-in, sign-up, password reset) live in the provider, not here.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Session, AuthError>;
}

/// Asks the hosted auth endpoint (`GET {endpoint}/user`) to validate the
/// token.
pub struct RemoteSessionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteSessionProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        RemoteSessionProvider {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for RemoteSessionProvider {
    async fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.endpoint.trim_end_matches('/')))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidToken);
        }
        response
            .json::<Session>()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))
    }
}

/// Fixed token table for development and tests. Parsed from
/// `AUTH_STATIC_TOKENS`, entries `token=user_id:email` separated by commas.
#[derive(Default)]
pub struct StaticSessionProvider {
    tokens: HashMap<String, Session>,
}

impl StaticSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(
        mut self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.tokens.insert(
            token.into(),
            Session {
                user_id: user_id.into(),
                email: email.into(),
            },
        );
        self
    }

    pub fn from_spec(spec: &str) -> Self {
        let mut provider = Self::new();
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((token, identity)) = entry.split_once('=') else {
                tracing::warn!(entry, "ignoring malformed static token entry");
                continue;
            };
            let (user_id, email) = match identity.split_once(':') {
                Some((user_id, email)) => (user_id, email),
                None => (identity, ""),
            };
            provider = provider.with_token(token, user_id, email);
        }
        provider
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
