use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub session_cookie_secure: bool,
    /// Path prefix for signup/login/logout/dashboard, e.g. `/accounts`.
    pub accounts_prefix: String,
    /// Mounts the `/__debug__` diagnostics router.
    pub debug: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userdesk-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(60 * 24 * 14),
        };
        let session_cookie_secure = std::env::var("SESSION_COOKIE_SECURE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let accounts_prefix = normalize_prefix(
            &std::env::var("ACCOUNTS_PREFIX").unwrap_or_else(|_| "/accounts".into()),
        );
        let debug = std::env::var("APP_DEBUG")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("APP_PORT must be a port number, got {v:?}"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url,
            jwt,
            session_cookie_secure,
            accounts_prefix,
            debug,
            host,
            port,
        })
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.jwt.ttl_minutes * 60
    }

    /// Listen address; `host` must be an IP literal.
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .trim()
            .parse()
            .with_context(|| format!("APP_HOST must be an IP address, got {:?}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Absolute path of an account route, e.g. `account_path("login")`.
    pub fn account_path(&self, name: &str) -> String {
        format!("{}/{}", self.accounts_prefix, name)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Leading slash, no trailing slash. An empty prefix mounts account routes at the root.
pub(crate) fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(v), "{v} should be true");
        }
        for v in ["0", "false", "", "nope"] {
            assert!(!parse_flag(v), "{v} should be false");
        }
    }

    #[test]
    fn bind_addr_accepts_ipv4_and_ipv6_hosts() {
        let mut config = crate::state::AppState::fake().config.as_ref().clone();
        config.host = "127.0.0.1".into();
        config.port = 9000;
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");

        config.host = "::1".into();
        assert_eq!(config.bind_addr().unwrap().to_string(), "[::1]:9000");

        config.host = "not a host".into();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn normalize_prefix_trims_slashes() {
        assert_eq!(normalize_prefix("accounts"), "/accounts");
        assert_eq!(normalize_prefix("/accounts/"), "/accounts");
        assert_eq!(normalize_prefix("//users//"), "/users");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }
}
