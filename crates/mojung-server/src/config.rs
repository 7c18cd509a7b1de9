use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use mojung_auth::SessionConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MOJUNG_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub page_size: u64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` reads the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("MOJUNG_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let access_secs: i64 = parse(&lookup, "MOJUNG_ACCESS_TTL_SECS", 3600)?;
        let refresh_secs: i64 = parse(&lookup, "MOJUNG_REFRESH_TTL_SECS", 30 * 24 * 3600)?;
        if access_secs <= 0 {
            return Err(invalid("MOJUNG_ACCESS_TTL_SECS", access_secs));
        }
        if refresh_secs < access_secs {
            return Err(invalid("MOJUNG_REFRESH_TTL_SECS", refresh_secs));
        }

        let page_size: u64 = parse(&lookup, "MOJUNG_PAGE_SIZE", 4)?;
        if page_size == 0 {
            return Err(invalid("MOJUNG_PAGE_SIZE", page_size));
        }

        Ok(Self {
            jwt_secret,
            db_path: lookup("MOJUNG_DB_PATH")
                .unwrap_or_else(|| "mojung.db".into())
                .into(),
            host: lookup("MOJUNG_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&lookup, "MOJUNG_PORT", 5000)?,
            access_ttl: Duration::seconds(access_secs),
            refresh_ttl: Duration::seconds(refresh_secs),
            page_size,
            secure_cookies: parse(&lookup, "MOJUNG_SECURE_COOKIES", false)?,
        })
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            secret: self.jwt_secret.clone(),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn invalid(name: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = load(&[("MOJUNG_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.db_path, PathBuf::from("mojung.db"));
        assert_eq!(cfg.page_size, 4);
        assert_eq!(cfg.access_ttl, Duration::hours(1));
        assert_eq!(cfg.refresh_ttl, Duration::days(30));
        assert!(!cfg.secure_cookies);
    }

    #[test]
    fn placeholder_or_missing_secret_is_refused() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            load(&[("MOJUNG_JWT_SECRET", "dev-secret-change-me")]),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = load(&[("MOJUNG_JWT_SECRET", "ok-secret"), ("MOJUNG_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("MOJUNG_PORT"));

        let err = load(&[("MOJUNG_JWT_SECRET", "ok-secret"), ("MOJUNG_PAGE_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("MOJUNG_PAGE_SIZE"));
    }

    #[test]
    fn refresh_must_outlive_access() {
        let err = load(&[
            ("MOJUNG_JWT_SECRET", "ok-secret"),
            ("MOJUNG_ACCESS_TTL_SECS", "600"),
            ("MOJUNG_REFRESH_TTL_SECS", "60"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MOJUNG_REFRESH_TTL_SECS"));
    }
}
