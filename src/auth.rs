//! JWT session layer and password hashing.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! One refresh token is active per user at a time; it is persisted on the
//! account and must match on refresh. Passwords are argon2id hashes.

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::Role;
use crate::error::ApiError;
use crate::http::AppState;
use crate::store::UserStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

pub struct AuthKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl AuthKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.jwt_access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            access_ttl: config.jwt_access_expires_in as i64,
            refresh_ttl: config.jwt_refresh_expires_in as i64,
        }
    }

    fn issue(&self, key: &EncodingKey, sub: Uuid, role: Role, ttl: i64) -> anyhow::Result<String> {
        let exp = (Utc::now() + Duration::seconds(ttl)).timestamp() as usize;
        let claims = Claims { sub, role, exp };
        encode(&Header::default(), &claims, key).map_err(|e| anyhow!("token encoding: {e}"))
    }

    pub fn issue_access_token(&self, sub: Uuid, role: Role) -> anyhow::Result<String> {
        self.issue(&self.access_encoding, sub, role, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, sub: Uuid, role: Role) -> anyhow::Result<String> {
        self.issue(&self.refresh_encoding, sub, role, self.refresh_ttl)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.access_decoding, &Validation::default()).map(|t| t.claims)
    }

    pub fn verify_refresh_token(
        &self,
        token: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.refresh_decoding, &Validation::default()).map(|t| t.claims)
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// The authenticated caller. Verifies the bearer token and re-checks the
/// account against the store so revoked/deactivated users are rejected even
/// with an unexpired token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("No token provided, authorization denied".to_owned())
        })?;
        let invalid = || ApiError::Unauthorized("Token is not valid".to_owned());
        let claims = state.auth.verify_access_token(token).map_err(|_| invalid())?;
        let user = state
            .store
            .get_user(claims.sub)
            .await
            .map_err(|_| invalid())?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;
        Ok(Self {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

/// [`AuthUser`] plus the admin-role gate used on write endpoints.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden(
                "Access denied. Admin privileges required.".to_owned(),
            ));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthKeys {
        let config = Config {
            database_url: String::new(),
            port: 0,
            jwt_access_secret: "access-secret".into(),
            jwt_refresh_secret: "refresh-secret".into(),
            jwt_access_expires_in: 3600,
            jwt_refresh_expires_in: 3600,
            media_root: "media".into(),
            public_base_url: "http://localhost".into(),
            cors_origins: vec![],
        };
        AuthKeys::from_config(&config)
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn access_token_roundtrip() {
        let keys = keys();
        let id = Uuid::new_v4();
        let token = keys.issue_access_token(id, Role::Admin).unwrap();
        let claims = keys.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let keys = keys();
        let token = keys.issue_refresh_token(Uuid::new_v4(), Role::User).unwrap();
        assert!(keys.verify_access_token(&token).is_err());
        assert!(keys.verify_refresh_token(&token).is_ok());
    }
}
