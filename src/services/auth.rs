use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::{AuthConfig, SecurityConfig};
use crate::db::{Store, User};

const ACCESS_AUDIENCE: &str = "pickarr";
const REFRESH_AUDIENCE: &str = "pickarr:refresh";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Username must be at least 3 characters")]
    UsernameTooShort,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token ID, the unit of revocation.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    store: Store,
    auth_config: AuthConfig,
    security_config: SecurityConfig,
}

impl AuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        auth_config: AuthConfig,
        security_config: SecurityConfig,
    ) -> Self {
        Self {
            store,
            auth_config,
            security_config,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.len() < 3 {
            return Err(AuthError::UsernameTooShort);
        }
        if password.len() < 6 {
            return Err(AuthError::PasswordTooShort);
        }

        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let user = self
            .store
            .create_user(username, password, false, &self.security_config)
            .await?;

        info!("Registered user: {}", user.username);
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let username = username.trim();

        if !self.store.verify_user_password(username, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let pair = self.issue_pair(&user)?;
        info!("User logged in: {}", user.username);
        Ok((user, pair))
    }

    /// Exchange a refresh token for a fresh pair. The presented token is
    /// revoked, so each refresh token works exactly once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        let claims = self.decode_refresh(refresh_token)?;

        if self.store.is_token_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }

        let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.store
            .revoke_token(&claims.jti, "refresh_rotation")
            .await?;

        let pair = self.issue_pair(&user)?;
        Ok((user, pair))
    }

    /// Revoke the presented access token, and the refresh token if the
    /// client sent one along.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let claims = self.decode_access(access_token)?;
        self.store.revoke_token(&claims.jti, "logout").await?;

        if let Some(refresh_token) = refresh_token
            && let Ok(claims) = self.decode_refresh(refresh_token)
        {
            self.store.revoke_token(&claims.jti, "logout").await?;
        }

        Ok(())
    }

    /// Resolve a bearer access token to its user, rejecting revoked tokens.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.decode_access(access_token)?;

        if self.store.is_token_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }

        let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self.encode_token(
            user.id,
            ACCESS_AUDIENCE,
            Duration::minutes(self.auth_config.access_token_minutes),
            &self.auth_config.access_token_secret,
        )?;
        let refresh_token = self.encode_token(
            user.id,
            REFRESH_AUDIENCE,
            Duration::days(self.auth_config.refresh_token_days),
            &self.auth_config.refresh_token_secret,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn encode_token(
        &self,
        user_id: i32,
        audience: &str,
        lifetime: Duration,
        secret: &str,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            aud: audience.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
    }

    fn decode_access(&self, token: &str) -> Result<Claims, AuthError> {
        Self::decode_token(
            token,
            ACCESS_AUDIENCE,
            &self.auth_config.access_token_secret,
        )
    }

    fn decode_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        Self::decode_token(
            token,
            REFRESH_AUDIENCE,
            &self.auth_config.refresh_token_secret,
        )
    }

    fn decode_token(token: &str, audience: &str, secret: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
