use std::{env, str::FromStr};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    /// Session token lifetime in seconds.
    pub session_ttl: usize,
    pub cookie_secure: bool,
    pub log_level: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Route guard
    pub login_path: String,
    pub dashboard_path: String,
    pub protected_prefixes: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` feeds it the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_prefix = or_default("API_PREFIX", "/api");
        let protected_prefixes = match lookup("PROTECTED_PREFIXES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![api_prefix.clone()],
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            session_ttl: parse_or(&lookup, "SESSION_TTL", 28_800)?, // default 8h
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            log_level: or_default("LOG_LEVEL", "info"),

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            login_path: or_default("LOGIN_PATH", "/auth/login"),
            dashboard_path: or_default("DASHBOARD_PATH", &format!("{api_prefix}/dashboard")),
            protected_prefixes,
            api_prefix,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SERVER_ADDR" => Some("127.0.0.1:8080".into()),
        "DATABASE_URL" => Some("postgres://localhost/leavedesk".into()),
        "JWT_SECRET" => Some("test-secret".into()),
        _ => None,
    })
    .expect("test config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "0.0.0.0:8080"),
        ("DATABASE_URL", "postgres://db/app"),
        ("JWT_SECRET", "s3cret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.session_ttl, 28_800);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.dashboard_path, "/api/dashboard");
        assert_eq!(config.protected_prefixes, vec!["/api".to_string()]);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn missing_required_is_an_error() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_number_is_an_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SESSION_TTL", "eight hours"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL"));
    }

    #[test]
    fn protected_prefixes_are_split_and_trimmed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PROTECTED_PREFIXES", " /api, /reports ,,"));
        pairs.push(("API_PREFIX", "/v2"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.protected_prefixes, vec!["/api", "/reports"]);
        assert_eq!(config.dashboard_path, "/v2/dashboard");
    }
}
