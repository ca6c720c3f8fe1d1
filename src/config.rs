//! Service configuration loaded from environment variables (after `dotenv`).

use crate::utils::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_FROM_EMAIL: &str = "noreply@yourdomain.com";
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
/// One hundred years; keeps `now + ttl` far inside chrono's range.
pub const MAX_TOKEN_TTL_DAYS: i64 = 36_500;
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// MongoDB URI; `None` keeps signups in memory.
    pub database_url: Option<String>,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub resend_api_url: String,
    /// Where the signup flow posts access emails; `None` selects the simulated notifier.
    pub send_endpoint: Option<String>,
    pub public_base_url: String,
    pub playbook_path: String,
    /// `None` means tokens never expire.
    pub token_ttl: Option<chrono::Duration>,
    pub simulated_delay: Duration,
    pub admin_api_key: Option<String>,
    /// Empty list allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated as unset
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("PORT must be a port number, got '{}'", raw)))?,
            None => 3002,
        };

        let ttl_days = match get("ACCESS_TOKEN_TTL_DAYS") {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                AppError::Config(format!("ACCESS_TOKEN_TTL_DAYS must be an integer, got '{}'", raw))
            })?,
            None => DEFAULT_TOKEN_TTL_DAYS,
        };
        if !(0..=MAX_TOKEN_TTL_DAYS).contains(&ttl_days) {
            return Err(AppError::Config(format!(
                "ACCESS_TOKEN_TTL_DAYS must be between 0 and {}, got {}",
                MAX_TOKEN_TTL_DAYS, ttl_days
            )));
        }
        let token_ttl = if ttl_days > 0 {
            Some(chrono::Duration::try_days(ttl_days).ok_or_else(|| {
                AppError::Config(format!("ACCESS_TOKEN_TTL_DAYS out of range: {}", ttl_days))
            })?)
        } else {
            None
        };

        let delay_ms = match get("SIMULATED_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("SIMULATED_DELAY_MS must be an integer, got '{}'", raw))
            })?,
            None => DEFAULT_SIMULATED_DELAY_MS,
        };

        let mut playbook_path = get("PLAYBOOK_PATH").unwrap_or_else(|| "/playbook".to_string());
        if !playbook_path.starts_with('/') {
            playbook_path.insert(0, '/');
        }

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL"),
            resend_api_key: get("RESEND_API_KEY"),
            from_email: get("FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            resend_api_url: get("RESEND_API_URL").unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            send_endpoint: get("PLAYBOOK_SEND_ENDPOINT"),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            playbook_path,
            token_ttl,
            simulated_delay: Duration::from_millis(delay_ms),
            admin_api_key: get("ADMIN_API_KEY"),
            cors_allowed_origins,
        })
    }

    /// Public URL of the gated page, without query string.
    pub fn playbook_url(&self) -> String {
        format!("{}{}", self.public_base_url, self.playbook_path)
    }
}
