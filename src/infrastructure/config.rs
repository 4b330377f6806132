use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// A `postgres://` URL or a libpq key/value conninfo string.
    pub url: String,
    pub max_pool_size: u32,
    pub min_idle: u32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// Rows fetched per round trip when streaming document listings.
    pub page_size: i64,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv` first if a `.env` file should apply.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `DATABASE_URL` wins; otherwise a libpq key/value conninfo string is
    /// assembled from the `PG*` variables with the usual local defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => url,
            None => {
                let mut params = vec![
                    ("host", lookup("PGHOST").unwrap_or_else(|| "localhost".to_string())),
                    ("port", lookup("PGPORT").unwrap_or_else(|| "5432".to_string())),
                    ("dbname", lookup("PGDATABASE").unwrap_or_else(|| "postgres".to_string())),
                    ("user", lookup("PGUSER").unwrap_or_else(|| "postgres".to_string())),
                ];
                if let Some(password) = lookup("PGPASSWORD").filter(|p| !p.is_empty()) {
                    params.push(("password", password));
                }
                conninfo(&params)
            }
        };

        let database = DatabaseConfig {
            url,
            max_pool_size: parse_number(&lookup, "DB_POOL_MAX_SIZE", 10)?,
            min_idle: parse_number(&lookup, "DB_POOL_MIN_IDLE", 1)?,
            connect_timeout: Duration::from_secs(parse_number(&lookup, "DB_CONNECT_TIMEOUT_SECS", 30)?),
        };

        Ok(Self {
            database,
            page_size: parse_number(&lookup, "STORE_PAGE_SIZE", 100)?,
        })
    }
}

/// Values are single-quoted with `\` and `'` escaped, so any character is safe.
fn conninfo(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
            format!("{}='{}'", key, escaped)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(n) if n > T::from(0) => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(
            config.database.url,
            "host='localhost' port='5432' dbname='postgres' user='postgres'"
        );
        assert_eq!(config.database.max_pool_size, 10);
        assert_eq!(config.database.min_idle, 1);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://app@db/ocr"),
            ("PGHOST", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "postgres://app@db/ocr");
    }

    #[test]
    fn test_pg_variables_compose_url() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PGHOST", "db.internal"),
            ("PGPORT", "6432"),
            ("PGDATABASE", "extracr"),
            ("PGUSER", "ocr"),
            ("PGPASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(
            config.database.url,
            "host='db.internal' port='6432' dbname='extracr' user='ocr' password='secret'"
        );
    }

    #[test]
    fn test_reserved_characters_in_credentials_stay_quoted() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PGHOST", "/var/run/postgresql"),
            ("PGUSER", "ocr"),
            ("PGPASSWORD", "p@ss/w:rd"),
        ]))
        .unwrap();

        assert_eq!(
            config.database.url,
            "host='/var/run/postgresql' port='5432' dbname='postgres' user='ocr' password='p@ss/w:rd'"
        );

        let config = AppConfig::from_lookup(lookup_from(&[("PGPASSWORD", r"it's\x")])).unwrap();
        assert!(config.database.url.ends_with(r"password='it\'s\\x'"));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("DB_POOL_MAX_SIZE", "lots")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidNumber {
                name: "DB_POOL_MAX_SIZE",
                value: "lots".to_string()
            })
        );

        let result = AppConfig::from_lookup(lookup_from(&[("STORE_PAGE_SIZE", "0")]));
        assert!(result.is_err());
    }
}
