//! Session validation: access tokens issued by the hosted auth server

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience the auth server stamps on signed-in users' tokens
const AUDIENCE: &str = "authenticated";

/// JWT claims we rely on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // auth user id
    pub exp: i64,
    pub aud: String,
    pub email: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct ValidSession {
    pub user_id: Uuid,
    /// Key for inactivity tracking; falls back to the user id for tokens without a session id
    pub session_key: String,
    /// Token `exp` (unix seconds)
    pub expires_at: i64,
}

/// Validate an access token and return the session it belongs to
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<ValidSession, SessionError> {
    // HS256 only, to rule out algorithm confusion
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "sub", "aud"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => {
                tracing::debug!(error = ?e, "JWT decode error");
                SessionError::InvalidToken
            }
        },
    )?;

    let user_id = data
        .claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| SessionError::InvalidToken)?;
    let expires_at = data.claims.exp;
    let session_key = data
        .claims
        .session_id
        .unwrap_or_else(|| user_id.to_string());

    Ok(ValidSession {
        user_id,
        session_key,
        expires_at,
    })
}
