use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::model::Session;

/// Bearer token payload. The token is only a pointer to a session row;
/// revoking the session kills the token before `exp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Session id
    pub sid: String,
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_session(session: &Session, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sid: session.id.clone(),
            sub: session.user_id.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Session secret not configured")]
    InvalidSecret,

    #[error("Token generation error: {0}")]
    Generation(String),

    #[error("Invalid token: {0}")]
    Invalid(String),
}

pub fn generate_token(session: &Session, security: &SecurityConfig) -> Result<String, TokenError> {
    let secret = &security.session_secret;
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let claims = Claims::for_session(session, security.session_expiry_hours);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key).map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify signature and expiry, returning the claims
pub fn validate_token(token: &str, security: &SecurityConfig) -> Result<Claims, TokenError> {
    let secret = &security.session_secret;
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| TokenError::Invalid(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn issued_token_validates_back_to_session() {
        let security = AppConfig::development().security;
        let session = Session::new("u1");
        let token = generate_token(&session, &security).unwrap();

        let claims = validate_token(&token, &security).unwrap();
        assert_eq!(claims.sid, session.id);
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let security = AppConfig::development().security;
        let token = generate_token(&Session::new("u1"), &security).unwrap();

        let mut other = security.clone();
        other.session_secret = "another-secret".to_string();
        assert!(matches!(validate_token(&token, &other), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = AppConfig::development().security;
        security.session_secret.clear();
        assert!(matches!(
            generate_token(&Session::new("u1"), &security),
            Err(TokenError::InvalidSecret)
        ));
    }
}
