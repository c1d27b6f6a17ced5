//! # Authentication and Sessions
//!
//! Cookie-session authentication for the admin area. The session cookie
//! carries the user id and email plus an expiry, signed with HMAC-SHA256;
//! the middleware verifies the signature, rejects expired sessions and
//! exposes the authenticated identity through the [`CurrentUser`] extractor.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "portal_session";

/// Authenticated identity carried by a valid session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub user_email: String,
    /// Unix timestamp after which the session is invalid
    pub exp: i64,
}

/// Signing key for session cookies.
#[derive(Clone)]
pub struct SessionKey {
    secret: Vec<u8>,
    ttl_seconds: u64,
}

impl SessionKey {
    /// Builds a key from the configured secret. Local/test profiles without
    /// a configured secret get a random one, which invalidates sessions on
    /// restart.
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        let secret = match &config.session_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "No session secret configured; using a random key (sessions reset on restart)"
                );
                use rand::RngCore;
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
        };
        Self {
            secret,
            ttl_seconds: config.session_ttl_seconds,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            secret: b"0123456789abcdef0123456789abcdef".to_vec(),
            ttl_seconds: 3600,
        }
    }

    /// Issues a signed session token for the given user.
    pub fn sign(&self, user_id: Uuid, user_email: &str) -> String {
        let session = Session {
            user_id,
            user_email: user_email.to_string(),
            exp: chrono::Utc::now().timestamp() + self.ttl_seconds as i64,
        };
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&session).expect("session serializes to JSON"));
        let signature = URL_SAFE_NO_PAD.encode(self.mac(payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Verifies a token's signature and expiry, returning the session.
    pub fn verify(&self, token: &str) -> Option<Session> {
        let (payload, signature) = token.split_once('.')?;
        let claimed = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let expected = self.mac(payload.as_bytes());
        if !bool::from(claimed.as_slice().ct_eq(expected.as_slice())) {
            return None;
        }

        let session: Session =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
        if session.exp <= chrono::Utc::now().timestamp() {
            return None;
        }
        Some(session)
    }

    /// `Set-Cookie` value establishing a session for the given user.
    pub fn session_cookie(&self, user_id: Uuid, user_email: &str) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.sign(user_id, user_email),
            self.ttl_seconds
        )
    }

    /// `Set-Cookie` value clearing the session.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly", SESSION_COOKIE)
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Extracts the session token from the request's Cookie header.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == SESSION_COOKIE).then_some(value)
            })
        })
}

/// Authentication middleware guarding the admin routes.
///
/// Requests without a valid session cookie receive a 401 problem+json
/// response; valid sessions are inserted into request extensions for the
/// [`CurrentUser`] extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = session_token(request.headers())
        .and_then(|token| state.session_key.verify(token))
        .ok_or_else(|| unauthorized(Some("Login required")))?;

    tracing::debug!(user_id = %session.user_id, "Authenticated session");

    let mut request = request;
    request.extensions_mut().insert(CurrentUser(session));

    Ok(next.run(request).await)
}

/// Extractor for the authenticated session on admin routes.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Login required")))
    }
}

// --- password hashing -----------------------------------------------------

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params, salt,
/// and hash).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::Argon2;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    use argon2::Argon2;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;
