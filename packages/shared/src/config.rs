use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::backoff::BackoffPolicy;
use crate::models::queue::MatchCriteria;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(String),
    Invalid { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "{} environment variable must be set", key)
            }
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNames {
    pub match_queue: String,
    pub rooms: String,
    pub room_connections: String,
    pub accounts: String,
    pub game_records: String,
    pub transactions: String,
    pub rewards: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    DynamoDb(TableNames),
    /// Single-process stores, for local runs.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub websocket_api_endpoint: Option<String>,
    pub match_criteria: MatchCriteria,
    pub reconnect_grace: Duration,
    pub deposit_tax_rate: Decimal,
    pub elo_k_factor: f64,
    pub platform_commission_rate: Decimal,
    pub default_currency: String,
    pub backoff: BackoffPolicy,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let store_backend = match env.or("STORE_BACKEND", "dynamodb").as_str() {
            "dynamodb" => StoreBackend::DynamoDb(TableNames {
                match_queue: env.required("MATCH_QUEUE_TABLE")?,
                rooms: env.required("ROOMS_TABLE")?,
                room_connections: env.required("ROOM_CONNECTIONS_TABLE")?,
                accounts: env.required("ACCOUNTS_TABLE")?,
                game_records: env.required("GAME_RECORDS_TABLE")?,
                transactions: env.required("TRANSACTIONS_TABLE")?,
                rewards: env.required("REWARDS_TABLE")?,
            }),
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let log_format = match env.or("LOG_FORMAT", "json").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let defaults = MatchCriteria::default();
        let match_criteria = MatchCriteria {
            tolerance_start: env.parsed("MATCH_TOLERANCE_START", defaults.tolerance_start)?,
            tolerance_step: env.parsed("MATCH_TOLERANCE_STEP", defaults.tolerance_step)?,
            max_iterations: env.parsed("MATCH_MAX_ITERATIONS", defaults.max_iterations)?,
            allow_extended_search: false,
        };

        Ok(AppConfig {
            bind_addr: env.or("BIND_ADDR", "0.0.0.0:8080"),
            store_backend,
            websocket_api_endpoint: (env.lookup)("WEBSOCKET_API_ENDPOINT"),
            match_criteria,
            reconnect_grace: Duration::from_secs(env.parsed("RECONNECT_GRACE_SECS", 30u64)?),
            deposit_tax_rate: env.parsed("DEPOSIT_TAX_RATE", Decimal::new(28, 2))?,
            elo_k_factor: env.parsed("ELO_K_FACTOR", 32.0f64)?,
            platform_commission_rate: env.parsed("PLATFORM_COMMISSION_RATE", Decimal::ZERO)?,
            default_currency: env.or("DEFAULT_CURRENCY", "INR"),
            backoff: backoff_from(&env)?,
            log_format,
        })
    }
}

fn backoff_from<F>(env: &Env<F>) -> Result<BackoffPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let max_attempts = env.parsed("BACKOFF_MAX_ATTEMPTS", 6u32)?;
    let initial = Duration::from_millis(env.parsed("BACKOFF_INITIAL_MS", 50u64)?);
    match env.or("BACKOFF_KIND", "exponential").as_str() {
        "fixed" => Ok(BackoffPolicy::Fixed {
            delay: initial,
            max_attempts,
        }),
        "exponential" => {
            let multiplier: f64 = env.parsed("BACKOFF_MULTIPLIER", 2.0f64)?;
            // Delays must never shrink, go negative or become NaN.
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(ConfigError::Invalid {
                    key: "BACKOFF_MULTIPLIER".to_string(),
                    value: multiplier.to_string(),
                });
            }
            Ok(BackoffPolicy::Exponential {
                initial,
                max: Duration::from_millis(env.parsed("BACKOFF_MAX_MS", 1000u64)?),
                multiplier,
                max_attempts,
                jitter: env.parsed("BACKOFF_JITTER", true)?,
            })
        }
        other => Err(ConfigError::Invalid {
            key: "BACKOFF_KIND".to_string(),
            value: other.to_string(),
        }),
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.lookup)(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match (self.lookup)(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
            None => Ok(default),
        }
    }
}
