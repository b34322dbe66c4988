use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use cvx_types::UserId;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// A caller whose identity has been resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user: UserId,
}

/// Raw, unverified credentials taken from a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Value of the configured identity header.
    Header(String),
    Anonymous,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap, header: &str) -> Self {
        headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self::Header(v.to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

/// Resolves credentials to a user identifier.
///
/// Verification (tokens, sessions, signatures) lives behind this trait; the
/// handlers only ever see a resolved [`Identity`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Trusts the identity header as-is. Suitable behind a gateway that has
/// already verified the caller.
pub struct HeaderAuth;

#[async_trait]
impl AuthProvider for HeaderAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Header(value) => UserId::new(value.clone())
                .map(|user| Identity { user })
                .map_err(|_| ServerError::Unauthenticated),
            Credentials::Anonymous => Err(ServerError::Unauthenticated),
        }
    }
}

/// Extractor for handlers that require a resolved caller.
///
/// Rejects with 401 before the body is read.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers, &state.config.identity_header);
        let identity = state.auth.authenticate(&credentials).await?;
        Ok(Self(identity.user))
    }
}
