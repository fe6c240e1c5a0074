use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
    /// Algorithm worker service configuration.
    pub algo: AlgoServiceConfig,
}

/// Connection and retry configuration for the external algorithm service.
#[derive(Debug, Clone)]
pub struct AlgoServiceConfig {
    /// Base URL of the worker, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Training submit route appended to the base URL.
    pub training_path: String,
    /// Health probe route appended to the base URL.
    pub health_path: String,
    /// Connect/read timeout for worker calls.
    pub timeout: Duration,
    /// Total submit attempts before giving up.
    pub submit_max_attempts: u32,
    /// Sleep between submit attempts.
    pub submit_retry_interval: Duration,
    /// Health-check retries on top of the first probe.
    pub health_max_retries: u32,
    /// Sleep between health probes.
    pub health_retry_interval: Duration,
    /// Upper bound on concurrently running dispatches.
    pub max_concurrent_dispatches: usize,
    /// Root under which the worker writes per-task analysis results.
    pub result_root: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            algo: AlgoServiceConfig::from_env(),
        }
    }
}

impl AlgoServiceConfig {
    /// Load worker configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default              |
    /// |----------------------------------|----------------------|
    /// | `ALGO_URL`                       | `http://localhost:5000` |
    /// | `ALGO_TRAINING_PATH`             | `/api/train/start`   |
    /// | `ALGO_HEALTH_PATH`               | `/api/train/health`  |
    /// | `ALGO_TIMEOUT_SECS`              | `15`                 |
    /// | `ALGO_SUBMIT_MAX_ATTEMPTS`       | `3`                  |
    /// | `ALGO_SUBMIT_RETRY_INTERVAL_MS`  | `5000`               |
    /// | `ALGO_HEALTH_MAX_RETRIES`        | `2`                  |
    /// | `ALGO_HEALTH_RETRY_INTERVAL_MS`  | `3000`               |
    /// | `DISPATCH_MAX_CONCURRENT`        | `4`                  |
    /// | `RESULT_PATH_ROOT`               | `/data/results`      |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ALGO_URL")
                .unwrap_or_else(|_| "http://localhost:5000".into()),
            training_path: std::env::var("ALGO_TRAINING_PATH")
                .unwrap_or_else(|_| "/api/train/start".into()),
            health_path: std::env::var("ALGO_HEALTH_PATH")
                .unwrap_or_else(|_| "/api/train/health".into()),
            timeout: Duration::from_secs(env_parse("ALGO_TIMEOUT_SECS", 15)),
            submit_max_attempts: env_parse("ALGO_SUBMIT_MAX_ATTEMPTS", 3),
            submit_retry_interval: Duration::from_millis(env_parse(
                "ALGO_SUBMIT_RETRY_INTERVAL_MS",
                5000,
            )),
            health_max_retries: env_parse("ALGO_HEALTH_MAX_RETRIES", 2),
            health_retry_interval: Duration::from_millis(env_parse(
                "ALGO_HEALTH_RETRY_INTERVAL_MS",
                3000,
            )),
            max_concurrent_dispatches: env_parse("DISPATCH_MAX_CONCURRENT", 4),
            result_root: std::env::var("RESULT_PATH_ROOT")
                .unwrap_or_else(|_| "/data/results".into()),
        }
    }
}

/// Parse an env var into any FromStr type, falling back to `default` when
/// unset. Panics on a present-but-invalid value: we want misconfiguration
/// to fail fast at startup.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} is invalid: {e:?}")),
        Err(_) => default,
    }
}
