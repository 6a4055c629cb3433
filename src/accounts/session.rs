//! Session tokens and the cookie that carries them.
//!
//! A session is a signed JWT naming the user; it lives in an `HttpOnly`
//! cookie. [`CurrentUser`] resolves it on protected routes and sends
//! anonymous visitors to the login page.

use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{COOKIE, LOCATION},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    accounts::{claims::Claims, repo_types::User},
    config::{AppConfig, JwtConfig},
    state::AppState,
};

pub const SESSION_COOKIE_NAME: &str = "userdesk_session";

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: ttl_from_minutes(ttl_minutes),
        }
    }
}

fn ttl_from_minutes(minutes: i64) -> Duration {
    Duration::from_secs((minutes.max(0) as u64) * 60)
}

impl SessionKeys {
    /// Signs a session for `user_id`, bound to the user's current session epoch.
    pub fn sign(&self, user_id: Uuid, epoch: i64) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sep: epoch,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(config: &AppConfig, token: &str) -> anyhow::Result<HeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie(config: &AppConfig) -> anyhow::Result<HeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().unwrap_or_default().trim();
            let val = parts.next().unwrap_or_default().trim();
            if key == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// 302 Found with a `Location` header.
pub fn redirect_found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(e) => {
            error!(error = %e, "invalid redirect location");
            (StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect").into_response()
        }
    }
}

/// Redirect to the login page, remembering where the visitor was headed.
pub fn login_redirect(config: &AppConfig, next: &str) -> Response {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    redirect_found(&format!("{}?next={}", config.account_path("login"), encoded))
}

/// The authenticated, active user behind the session cookie.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let Some(token) = extract_session_token(&parts.headers) else {
            debug!(path = %next, "no session cookie");
            return Err(login_redirect(&state.config, &next));
        };

        let keys = SessionKeys::from_ref(state);
        let claims = match keys.verify(&token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired session token");
                return Err(login_redirect(&state.config, &next));
            }
        };

        let user = match state.store.find_by_id(claims.sub).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(user_id = %claims.sub, "session for unknown user");
                return Err(login_redirect(&state.config, &next));
            }
            Err(e) => {
                error!(error = %e, user_id = %claims.sub, "session user lookup failed");
                return Err(
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
                );
            }
        };

        if !user.is_active {
            warn!(user_id = %user.id, "session for inactive user");
            return Err(login_redirect(&state.config, &next));
        }

        if claims.sep != user.session_epoch {
            warn!(user_id = %user.id, "session revoked by logout");
            return Err(login_redirect(&state.config, &next));
        }

        Ok(CurrentUser(user))
    }
}
