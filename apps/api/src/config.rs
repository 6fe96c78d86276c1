use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DURATION_MINUTES: i32 = 35;
const DEFAULT_QUESTION_COUNT: usize = 25;
const DEFAULT_GRACE_MINUTES: i64 = 2;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_STUDY_PLAN_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Built once at startup and cloned into shared state; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub assessment_duration_minutes: i32,
    pub question_count: usize,
    pub expiry_grace_minutes: i64,
    pub sweep_interval_secs: u64,
    pub study_plan_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", DEFAULT_PORT)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            assessment_duration_minutes: optional_env(
                "ASSESSMENT_DURATION_MINUTES",
                DEFAULT_DURATION_MINUTES,
            )?,
            question_count: optional_env("QUESTION_COUNT", DEFAULT_QUESTION_COUNT)?,
            expiry_grace_minutes: optional_env("EXPIRY_GRACE_MINUTES", DEFAULT_GRACE_MINUTES)?,
            sweep_interval_secs: optional_env("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
            study_plan_timeout_secs: optional_env(
                "STUDY_PLAN_TIMEOUT_SECS",
                DEFAULT_STUDY_PLAN_TIMEOUT_SECS,
            )?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.assessment_duration_minutes > 0,
            "ASSESSMENT_DURATION_MINUTES must be positive"
        );
        ensure!(self.question_count > 0, "QUESTION_COUNT must be positive");
        ensure!(
            self.expiry_grace_minutes >= 0,
            "EXPIRY_GRACE_MINUTES must not be negative"
        );
        // tokio intervals panic on a zero period
        ensure!(self.sweep_interval_secs > 0, "SWEEP_INTERVAL_SECS must be positive");
        ensure!(
            self.study_plan_timeout_secs > 0,
            "STUDY_PLAN_TIMEOUT_SECS must be positive"
        );
        Ok(())
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.expiry_grace_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn study_plan_timeout(&self) -> Duration {
        Duration::from_secs(self.study_plan_timeout_secs)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            anthropic_api_key: "test-key".to_string(),
            port: DEFAULT_PORT,
            rust_log: "debug".to_string(),
            assessment_duration_minutes: DEFAULT_DURATION_MINUTES,
            question_count: DEFAULT_QUESTION_COUNT,
            expiry_grace_minutes: DEFAULT_GRACE_MINUTES,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            study_plan_timeout_secs: 1,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}
