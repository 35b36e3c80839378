use std::{sync::Arc, time::Duration};

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::{
    pkg::internal::{
        adaptors::users::spec::{NewUser, Role, UserEntry, UserProfile},
        store::{with_deadline, Store},
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        TokenIssuer {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &UserEntry) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal("failed to sign token", e))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| AppError::internal("failed to hash password", e))
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    let verdict = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(verdict.unwrap_or_else(|e| {
        tracing::error!("stored password hash is unreadable: {}", e);
        false
    }))
}

pub struct AuthService {
    store: Arc<dyn Store>,
    deadline: Duration,
    tokens: TokenIssuer,
    cost: u32,
    // verified against when the login name is unknown
    dummy_hash: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, deadline: Duration, tokens: TokenIssuer, cost: u32) -> Result<Self> {
        let dummy_hash = bcrypt::hash("not-a-real-password", cost)
            .map_err(|e| AppError::internal("failed to prepare password hashing", e))?;
        Ok(AuthService {
            store,
            deadline,
            tokens,
            cost,
            dummy_hash,
        })
    }

    /// Both an unknown login and a wrong password end in the same
    /// `InvalidCredentials` after one bcrypt verification.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<(UserProfile, String)> {
        let user = with_deadline(self.deadline, self.store.user_by_login(login)).await?;
        let hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());
        let verified = verify_password(password.to_string(), hash).await?;
        match user {
            Some(user) if verified => {
                let token = self.tokens.issue(&user)?;
                tracing::info!("user {} logged in", user.id);
                Ok((user.into(), token))
            }
            _ => {
                tracing::warn!("login rejected");
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.validate(token)
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile> {
        with_deadline(self.deadline, self.store.user_by_id(user_id))
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found("user"))
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserProfile> {
        let password_hash = hash_password(password.to_string(), self.cost).await?;
        let user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role,
        };
        let created = with_deadline(self.deadline, self.store.create_user(user)).await?;
        tracing::info!("created {:?} user {}", created.role, created.id);
        Ok(created.into())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::{AuthError, TokenIssuer};
    use crate::{
        pkg::internal::{adaptors::users::spec::Role, fixtures},
        prelude::AppError,
    };

    #[tokio::test]
    #[traced_test]
    async fn login_token_carries_the_user_id() {
        let world = fixtures::world().await;
        let user = world.user("budi", Role::User).await;
        let (profile, token) = world.auth.authenticate("budi", fixtures::PASSWORD).await.unwrap();
        assert_eq!(profile.id, user.id);
        let claims = world.auth.validate(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "budi");
        assert_eq!(claims.role, Role::User);

        let (by_email, _) = world
            .auth
            .authenticate("budi@campus.test", fixtures::PASSWORD)
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    #[traced_test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let world = fixtures::world().await;
        world.user("budi", Role::User).await;
        let wrong = world.auth.authenticate("budi", "nope").await.unwrap_err();
        let unknown = world.auth.authenticate("ghost", fixtures::PASSWORD).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, AppError::Unauthenticated(_)));
        assert!(matches!(unknown, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn expired_and_tampered_tokens_are_rejected() {
        let world = fixtures::world().await;
        let user = world.user("budi", Role::User).await;
        let stale = TokenIssuer::new(fixtures::SECRET, chrono::Duration::seconds(-30));
        let token = stale.issue(&user).unwrap();
        assert_eq!(world.auth.validate(&token).unwrap_err(), AuthError::TokenExpired);

        let foreign = TokenIssuer::new("another-secret", chrono::Duration::hours(1));
        let token = foreign.issue(&user).unwrap();
        assert_eq!(world.auth.validate(&token).unwrap_err(), AuthError::InvalidToken);
        assert_eq!(world.auth.validate("not.a.token").unwrap_err(), AuthError::InvalidToken);
    }
}
