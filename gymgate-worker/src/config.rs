/// Configuration management for the sweep worker
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `SWEEP_RUN_TIME`: UTC time of day to run, `HH:MM` (default: 00:05)
/// - `SWEEP_ON_START`: Also run one sweep at startup (default: false)
/// - `RUST_LOG`: Log level (default: info)

use chrono::NaiveTime;
use std::env;

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// UTC time of day the sweep runs
    pub run_time: NaiveTime,

    /// Whether to run one sweep immediately at startup
    pub run_on_start: bool,
}

/// Default sweep time: shortly after the UTC day boundary, so yesterday's
/// forgotten sessions are closed before the gym opens
fn default_run_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// have invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let run_time = match env::var("SWEEP_RUN_TIME") {
            Ok(s) => NaiveTime::parse_from_str(&s, "%H:%M")
                .map_err(|e| anyhow::anyhow!("Invalid SWEEP_RUN_TIME {s:?}: {e}"))?,
            Err(_) => default_run_time(),
        };

        let run_on_start = env::var("SWEEP_ON_START")
            .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            max_connections,
            run_time,
            run_on_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_time() {
        assert_eq!(default_run_time(), NaiveTime::from_hms_opt(0, 5, 0).unwrap());
    }

    #[test]
    fn test_run_time_parse_format() {
        let parsed = NaiveTime::parse_from_str("03:30", "%H:%M").unwrap();
        assert_eq!(parsed, NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        assert!(NaiveTime::parse_from_str("25:00", "%H:%M").is_err());
    }
}
