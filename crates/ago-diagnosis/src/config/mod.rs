use crate::workflows::diagnosis::EvaluationSettings;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub rubric: RubricConfig,
    pub fetch: FetchConfig,
    pub judge: JudgeConfig,
    pub evaluation: EvaluationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let rubric_path = non_empty_var("APP_RUBRIC_PATH").map(PathBuf::from);

        let fetch = FetchConfig {
            timeout: Duration::from_secs(parse_var("APP_FETCH_TIMEOUT_SECS", 15)?),
            user_agent: non_empty_var("APP_FETCH_USER_AGENT")
                .unwrap_or_else(|| FetchConfig::DEFAULT_USER_AGENT.to_string()),
        };

        let judge = JudgeConfig {
            api_key: non_empty_var("APP_JUDGE_API_KEY").or_else(|| non_empty_var("OPENAI_API_KEY")),
            api_base: non_empty_var("APP_JUDGE_API_BASE"),
            model: non_empty_var("APP_JUDGE_MODEL")
                .unwrap_or_else(|| JudgeConfig::DEFAULT_MODEL.to_string()),
        };

        let defaults = EvaluationSettings::default();
        let evaluation = EvaluationSettings {
            judgment_timeout: Duration::from_secs(parse_var(
                "APP_JUDGE_TIMEOUT_SECS",
                defaults.judgment_timeout.as_secs(),
            )?),
            judgment_concurrency: parse_var("APP_JUDGE_CONCURRENCY", defaults.judgment_concurrency)?,
            evidence_char_limit: parse_var("APP_EVIDENCE_CHARS", defaults.evidence_char_limit)?,
        };

        if evaluation.judgment_timeout.is_zero() {
            return Err(ConfigError::InvalidNumber {
                key: "APP_JUDGE_TIMEOUT_SECS",
            });
        }
        if evaluation.judgment_concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APP_JUDGE_CONCURRENCY",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            rubric: RubricConfig { path: rubric_path },
            fetch,
            judge,
            evaluation,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Where the rubric is read from. `None` selects the rubric bundled with the crate.
#[derive(Debug, Clone, Default)]
pub struct RubricConfig {
    pub path: Option<PathBuf>,
}

/// Outbound page retrieval settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl FetchConfig {
    pub const DEFAULT_USER_AGENT: &'static str =
        concat!("ago-diagnosis/", env!("CARGO_PKG_VERSION"), " (AI search readiness check)");
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Language-model backend settings. Judgment is disabled when no API key is present.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
}

impl JudgeConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
