use std::env;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Budget bucket cut points, in ETB. Buckets are half-open: a budget exactly
/// at a cut point belongs to the bucket above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetThresholds {
    pub micro_max: Decimal,
    pub small_max: Decimal,
    pub medium_max: Decimal,
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            micro_max: dec!(15000),
            small_max: dec!(100000),
            medium_max: dec!(300000),
        }
    }
}

impl BudgetThresholds {
    /// Parses "15000,100000,300000". The three values must be strictly ascending.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut values = raw.split(',').map(|part| part.trim().parse::<Decimal>());
        let micro_max = values.next()?.ok()?;
        let small_max = values.next()?.ok()?;
        let medium_max = values.next()?.ok()?;
        if values.next().is_some() || micro_max >= small_max || small_max >= medium_max {
            return None;
        }
        Some(Self {
            micro_max,
            small_max,
            medium_max,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub commission_rate: Decimal,
    pub budget_thresholds: BudgetThresholds,
    pub telebirr_api_url: String,
    pub telebirr_api_key: String,
    pub provider_timeout: Duration,
    pub provider_max_attempts: u32,
    pub provider_retry_delay: Duration,
    pub reconcile_interval: Duration,
    pub reconcile_grace: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let commission_rate = match env::var("ADMIN_COMMISSION_RATE") {
            Ok(raw) => raw
                .parse::<Decimal>()
                .map_err(|_| ConfigError::Invalid {
                    name: "ADMIN_COMMISSION_RATE",
                    value: raw,
                })?,
            Err(_) => dec!(0.10),
        };

        let budget_thresholds = match env::var("BUDGET_THRESHOLDS") {
            Ok(raw) => BudgetThresholds::parse(&raw).ok_or(ConfigError::Invalid {
                name: "BUDGET_THRESHOLDS",
                value: raw,
            })?,
            Err(_) => BudgetThresholds::default(),
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            commission_rate,
            budget_thresholds,
            telebirr_api_url: env::var("TELEBIRR_API_URL")
                .unwrap_or_else(|_| "https://mock.telebirr.com".to_string()),
            telebirr_api_key: env::var("TELEBIRR_API_KEY").unwrap_or_default(),
            provider_timeout: Duration::from_secs(parse_secs("TELEBIRR_TIMEOUT_SECS", 10)?),
            provider_max_attempts: parse_secs("TELEBIRR_MAX_ATTEMPTS", 3)? as u32,
            provider_retry_delay: Duration::from_secs(parse_secs("TELEBIRR_RETRY_DELAY_SECS", 1)?),
            reconcile_interval: Duration::from_secs(parse_secs("RECONCILE_INTERVAL_SECS", 60)?),
            reconcile_grace: Duration::from_secs(parse_secs("RECONCILE_GRACE_SECS", 300)?),
        })
    }
}

fn parse_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_threshold_triple() {
        let parsed = BudgetThresholds::parse("15000,100000,300000").unwrap();
        assert_eq!(parsed, BudgetThresholds::default());
    }

    #[test]
    fn parses_with_whitespace() {
        let parsed = BudgetThresholds::parse("100, 500, 2000").unwrap();
        assert_eq!(parsed.micro_max, dec!(100));
        assert_eq!(parsed.medium_max, dec!(2000));
    }

    #[test]
    fn rejects_non_ascending_thresholds() {
        assert!(BudgetThresholds::parse("100000,15000,300000").is_none());
        assert!(BudgetThresholds::parse("100,100,300").is_none());
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(BudgetThresholds::parse("100,500").is_none());
        assert!(BudgetThresholds::parse("100,500,2000,9000").is_none());
        assert!(BudgetThresholds::parse("").is_none());
    }
}
