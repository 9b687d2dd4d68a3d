// src/config.rs
use std::net::IpAddr;
use std::ops::RangeInclusive;

const TOKEN_TTL_HOURS: RangeInclusive<i64> = 1..=720;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`) once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub host: IpAddr,
    pub port: u16,
    pub shift_duplicate_window_secs: i64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            token_ttl_hours: parse_within(&lookup, "TOKEN_TTL_HOURS", 24, TOKEN_TTL_HOURS)?,
            host: parse_or(&lookup, "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
            shift_duplicate_window_secs: parse_or(&lookup, "SHIFT_DUPLICATE_WINDOW_SECS", 60)?,
            admin_username: lookup("ADMIN_USERNAME").filter(|v| !v.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_within<F>(
    lookup: &F,
    key: &'static str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { key, value: value.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fuel"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.token_ttl_hours, 24);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.host, IpAddr::from([127, 0, 0, 1]));
        assert!(cfg.admin_username.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/fuel")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fuel"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn token_ttl_outside_bounds_is_rejected() {
        for ttl in ["0", "-5", "721", "9223372036854775807"] {
            let err = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/fuel"),
                ("JWT_SECRET", "secret"),
                ("TOKEN_TTL_HOURS", ttl),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. }));
        }
    }
}
