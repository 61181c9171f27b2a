use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

/// Where to listen and which store to open. Read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub trust_forwarded_for: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:guesswhat.db?mode=rwc".to_owned(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7000)),
            db_max_connections: 16,
            store_timeout: Duration::from_millis(5000),
            trust_forwarded_for: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            store_timeout: Duration::from_millis(
                parse_or(&lookup, "STORE_TIMEOUT_MS", defaults.store_timeout.as_millis() as u64)?
            ),
            trust_forwarded_for: parse_or(&lookup, "TRUST_FORWARDED_FOR", defaults.trust_forwarded_for)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim()
            .parse()
            .with_context(|| format!("invalid {key}={raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_fixed_deployment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.database_url, "sqlite:guesswhat.db?mode=rwc");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("STORE_TIMEOUT_MS", "250"),
            ("TRUST_FORWARDED_FOR", "true"),
            ("DATABASE_URL", "sqlite::memory:"),
        ])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert!(config.trust_forwarded_for);
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn garbage_is_a_startup_error() {
        let err = Config::from_lookup(lookup(&[("STORE_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("STORE_TIMEOUT_MS"));
    }
}
