use crate::domain_model::*;
use crate::domain_port::{SessionCacheError, UserRepoError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Failures surfaced by the auth and user services.
///
/// Display strings are safe to show to clients: they never say whether an
/// email exists or why a token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token invalid")]
    TokenInvalid,
    #[error("authentication required")]
    Unauthenticated,
    #[error("not allowed to access this resource")]
    Forbidden,
    #[error("email already in use")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    BadInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<SessionCacheError> for AuthError {
    fn from(err: SessionCacheError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<UserRepoError> for AuthError {
    fn from(err: UserRepoError) -> Self {
        match err {
            UserRepoError::DuplicateEmail => AuthError::UserExists,
            UserRepoError::Store(e) => AuthError::Store(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: AuthenticatedUser,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub payload: TokenPayload,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.payload.expires_at, 0).unwrap_or_default()
    }
}

/// Signs and verifies self-contained bearer tokens. CPU bound, no I/O.
pub trait TokenCodec: Send + Sync {
    fn issue(&self, kind: TokenKind, subject: &TokenSubject) -> Result<IssuedToken, AuthError>;

    /// Every failure (bad signature, malformed input, expiry, wrong kind) is
    /// reported as `AuthError::TokenInvalid`.
    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenPayload, AuthError>;

    fn ttl(&self, kind: TokenKind) -> Duration;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<AuthenticatedUser, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), AuthError>;
    /// Soft validation used on every request: any failure means "anonymous".
    async fn validate_access_token(&self, token: &str) -> Option<AuthenticatedUser>;
}
