//! Authentication service: registration, login, token validation, logout
//!
//! Tokens are opaque bearer credentials of the form `"{id}|{secret}"`. The
//! secret is 40 random alphanumeric characters, shown to the caller exactly
//! once at issuance; only its sha256 digest is persisted. Validation parses
//! the id, recomputes the digest and compares it in constant time, failing
//! closed to unauthenticated on any mismatch.

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{NewToken, NewUser, User};
use crate::repositories::{StoreError, TokenRepository, UserRepository};

/// Length of the random token secret, matching the original issuance.
const TOKEN_SECRET_LEN: usize = 40;

/// Uniform message for any credential mismatch, to prevent account
/// enumeration.
pub const INVALID_CREDENTIALS: &str = "The provided credentials are incorrect.";

/// Errors from authentication operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// User not found or wrong password; callers must surface the uniform
    /// message, the internal distinction lives only in the log.
    #[error("{INVALID_CREDENTIALS}")]
    InvalidCredentials,

    /// Registration email already in use
    #[error("email already registered")]
    EmailTaken,

    /// Token missing, malformed, unknown, mismatched or expired
    #[error("unauthenticated")]
    Unauthenticated,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The authenticated caller of the current request: the owning user plus the
/// specific token that was presented.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token_id: i64,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    token_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        token_ttl_days: i64,
    ) -> Self {
        Self {
            users,
            tokens,
            token_ttl_days,
        }
    }

    /// Register a new user and issue their first token.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(&NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // The store constraint is authoritative; a concurrent
                // registration loses the race here.
                StoreError::Duplicate(_) => AuthError::EmailTaken,
                StoreError::Other(e) => AuthError::Internal(e),
            })?;

        info!(user_id = user.id, email = %user.email, "registration successful");

        let token = self.issue_token(&user).await?;
        Ok((user, token))
    }

    /// Verify credentials and issue a fresh token. Other active tokens for
    /// the same user stay valid; concurrent sessions are supported.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email, reason = "user_not_found", "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&user.password_hash, password)? {
            warn!(email, reason = "invalid_password", "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = user.id, email = %user.email, "successful login");

        let token = self.issue_token(&user).await?;
        Ok((user, token))
    }

    /// Validate a presented token string and resolve the owning user.
    pub async fn authenticate(&self, presented: &str) -> Result<AuthSession, AuthError> {
        let Some((id, secret)) = parse_token_string(presented) else {
            return Err(AuthError::Unauthenticated);
        };

        let Some(token) = self.tokens.find_by_id(id).await? else {
            return Err(AuthError::Unauthenticated);
        };

        let presented_digest = Sha256::digest(secret.as_bytes());
        let stored_digest =
            hex::decode(&token.token_hash).map_err(|_| AuthError::Unauthenticated)?;
        if !constant_time_eq(&presented_digest, &stored_digest) {
            warn!(token_id = id, "token secret mismatch");
            return Err(AuthError::Unauthenticated);
        }

        if let Some(expires_at) = token.expires_at {
            if expires_at <= Utc::now() {
                return Err(AuthError::Unauthenticated);
            }
        }

        let Some(user) = self.users.find_by_id(token.user_id).await? else {
            return Err(AuthError::Unauthenticated);
        };

        Ok(AuthSession {
            user,
            token_id: token.id,
        })
    }

    /// Delete exactly the presented token. Best-effort: an already-absent
    /// row or a store failure is logged and never surfaced, so logout always
    /// reports success to the caller.
    pub async fn revoke(&self, token_id: i64, user_id: i64) {
        match self.tokens.delete(token_id).await {
            Ok(true) => info!(token_id, user_id, "token deleted on logout"),
            Ok(false) => warn!(token_id, user_id, "token already absent at logout"),
            Err(e) => warn!(token_id, user_id, error = %e, "failed to delete token at logout"),
        }
    }

    async fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_SECRET_LEN)
            .map(char::from)
            .collect();

        let token = self
            .tokens
            .create(&NewToken {
                user_id: user.id,
                name: format!("auth-token-{}", Utc::now().timestamp()),
                token_hash: hash_secret(&secret),
                abilities: vec!["*".to_string()],
                expires_at: Some(Utc::now() + Duration::days(self.token_ttl_days)),
            })
            .await?;

        Ok(format!("{}|{}", token.id, secret))
    }
}

/// Split a presented token string into its id and secret parts.
pub(crate) fn parse_token_string(presented: &str) -> Option<(i64, &str)> {
    let (id, secret) = presented.split_once('|')?;
    if secret.is_empty() {
        return None;
    }
    Some((id.parse().ok()?, secret))
}

/// Sha256 hex digest of a token secret, the only persisted form.
pub(crate) fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hash a password with argon2 and a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed_hash =
        PasswordHash::new(stored_hash).map_err(|e| anyhow!("Failed to parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
