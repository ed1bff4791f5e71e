use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::types::UserId;
use std::future::Future;

use crate::state::AppState;

/// JWT claims for the authentication shim (spec §4.6: boundary only, no
/// account/session management lives in this crate).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn new(user_id: UserId, role: &str, expires_in_hours: i64) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (now + chrono::Duration::hours(expires_in_hours)).timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

pub fn create_token(user_id: UserId, role: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, role, 24);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())?;
    Ok(token_data.claims)
}

fn extract_claims(parts: &Parts, jwt_secret: &str) -> Result<Claims, (StatusCode, &'static str)> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid authorization header"))?;

    verify_token(token, jwt_secret).map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid token"))
}

/// Extractor for any authenticated caller.
pub struct AuthUser {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 AppState,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let result = (|| {
            let claims = extract_claims(parts, &state.jwt_secret)?;
            let user_id = claims
                .user_id()
                .ok_or((StatusCode::UNAUTHORIZED, "Invalid user ID in token"))?;
            Ok(AuthUser {
                user_id,
                is_admin: claims.is_admin(),
            })
        })();

        Box::pin(std::future::ready(result))
    }
}

/// Extractor that additionally rejects non-admin callers.
pub struct AdminUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = (StatusCode, &'static str);

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 AppState,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let result = (|| {
            let claims = extract_claims(parts, &state.jwt_secret)?;
            if !claims.is_admin() {
                return Err((StatusCode::FORBIDDEN, "Admin role required"));
            }
            let user_id = claims
                .user_id()
                .ok_or((StatusCode::UNAUTHORIZED, "Invalid user ID in token"))?;
            Ok(AdminUser { user_id })
        })();

        Box::pin(std::future::ready(result))
    }
}
