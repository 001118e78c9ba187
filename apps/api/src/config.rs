use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Default shortlist threshold; a run may override it.
    pub screening_threshold: i64,
    pub max_concurrency: usize,
    pub ai_max_retries: u32,
    pub ai_backoff_ms: u64,
    /// Clamp out-of-range AI scores instead of failing the file.
    pub clamp_scores: bool,
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            screening_threshold: env_or("SCREENING_THRESHOLD", 80)?,
            max_concurrency: env_or("SCREENING_MAX_CONCURRENCY", 4)?,
            ai_max_retries: env_or("SCREENING_AI_MAX_RETRIES", 2)?,
            ai_backoff_ms: env_or("SCREENING_AI_BACKOFF_MS", 500)?,
            clamp_scores: env_or("SCREENING_CLAMP_SCORES", false)?,
            max_files: env_or("SCREENING_MAX_FILES", 20)?,
            max_file_bytes: env_or("SCREENING_MAX_FILE_BYTES", 10 * 1024 * 1024)?,
        };

        anyhow::ensure!(
            (0..=100).contains(&config.screening_threshold),
            "SCREENING_THRESHOLD must be between 0 and 100"
        );
        anyhow::ensure!(
            config.max_concurrency >= 1,
            "SCREENING_MAX_CONCURRENCY must be at least 1"
        );
        Ok(config)
    }

    /// Largest request body the upload route accepts: every file at the size
    /// limit plus room for the form fields.
    pub fn max_request_bytes(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_bytes)
            .saturating_add(1024 * 1024)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{value}'")),
        _ => Ok(default),
    }
}
