//! Shared-secret authentication for the ingestion routes.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Accepts callers presenting the configured key as either
/// `X-API-Key: <key>` or `Authorization: Bearer <key>`.
pub struct ApiKeyAuthenticator {
    key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// The key the caller presented, if any. `X-API-Key` wins over `Authorization`.
fn presented_key(request: &AuthRequest) -> Option<&str> {
    if let Some(key) = request.header("x-api-key") {
        return Some(key.trim());
    }

    let value = request.header("authorization")?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let presented = presented_key(request)
            .filter(|k| !k.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        if !constant_time_eq(presented.as_bytes(), self.key.as_bytes()) {
            tracing::debug!(source_ip = %request.source_ip, "Rejected API key");
            return Err(AuthError::InvalidCredentials("Invalid API key".to_string()));
        }

        Ok(Identity {
            caller: "ingest".to_string(),
            method: self.method_name().to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
