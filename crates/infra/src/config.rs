//! Configuration loading and representation.
//!
//! Everything comes from environment variables with defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | (required) | Postgres connection string |
//! | `FORGECART_DB_MAX_CONNECTIONS` | `10` | Pool size |
//! | `FORGECART_MAX_VARIANTS` | `10000` | Upper bound on variants per commit; `0` disables it |
//! | `FORGECART_LOG_FORMAT` | `json` | `json` or `pretty` |

use thiserror::Error;

use forgecart_observability::LogFormat;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_VARIANTS: usize = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// `None` when the bound is disabled.
    pub max_variants: Option<usize>,
    pub log_format: LogFormat,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections = match lookup("FORGECART_DB_MAX_CONNECTIONS") {
            Some(raw) => parse("FORGECART_DB_MAX_CONNECTIONS", &raw)?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "FORGECART_DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "pool needs at least one connection".to_string(),
            });
        }

        let max_variants = match lookup("FORGECART_MAX_VARIANTS") {
            Some(raw) => parse::<usize>("FORGECART_MAX_VARIANTS", &raw)?,
            None => DEFAULT_MAX_VARIANTS,
        };

        let log_format = match lookup("FORGECART_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: forgecart_observability::UnknownLogFormat| {
                ConfigError::Invalid {
                    name: "FORGECART_LOG_FORMAT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database_url,
            db_max_connections,
            max_variants: (max_variants > 0).then_some(max_variants),
            log_format,
        })
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config =
            CatalogConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/cart")]))
                .unwrap();

        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.max_variants, Some(DEFAULT_MAX_VARIANTS));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn database_url_is_required() {
        let err = CatalogConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn zero_disables_variant_bound() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/cart"),
            ("FORGECART_MAX_VARIANTS", "0"),
            ("FORGECART_LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.max_variants, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = CatalogConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/cart"),
            ("FORGECART_DB_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid { name: "FORGECART_DB_MAX_CONNECTIONS", .. }
        ));
    }
}
