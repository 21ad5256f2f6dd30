use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
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

/// Selects the print backend wired in at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Probe the local spooler and fall back to simulation when absent.
    Auto,
    Cups,
    Simulated,
}

impl PrintMode {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "cups" => Self::Cups,
            "simulated" | "simulate" | "sim" => Self::Simulated,
            _ => Self::Auto,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub print: PrintConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            print: PrintConfig::from_env()?,
        })
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
}

/// Everything the submission pipeline needs to know about the event.
#[derive(Debug, Clone)]
pub struct PrintConfig {
    pub upload_root: PathBuf,
    pub quota_path: PathBuf,
    pub seat_plan_path: PathBuf,
    pub event_name: String,
    pub max_pages: u32,
    pub max_file_bytes: u64,
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
    pub device: Option<String>,
    pub mode: PrintMode,
    pub text_rendering: bool,
}

impl PrintConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let upload_root =
            PathBuf::from(env::var("PRINT_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));
        let quota_path =
            PathBuf::from(env::var("PRINT_QUOTA_FILE").unwrap_or_else(|_| "quota.json".to_string()));
        let seat_plan_path = PathBuf::from(
            env::var("PRINT_SEAT_PLAN").unwrap_or_else(|_| "seat-plan.csv".to_string()),
        );
        let event_name =
            env::var("PRINT_EVENT_NAME").unwrap_or_else(|_| "Programming Contest".to_string());

        let max_pages = parse_number("PRINT_MAX_PAGES", 50)?;
        let max_file_mb: u64 = parse_number("PRINT_MAX_FILE_SIZE_MB", 10)?;
        let attempts = parse_number("PRINT_ATTEMPTS", 3)?;
        let timeout_secs: u64 = parse_number("PRINT_TIMEOUT_SECS", 60)?;
        let retry_secs: u64 = parse_number("PRINT_RETRY_DELAY_SECS", 2)?;

        let device = env::var("PRINT_DEVICE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let mode = PrintMode::from_str(&env::var("PRINT_MODE").unwrap_or_default());
        let text_rendering = parse_flag("PRINT_TEXT_RENDERING", true)?;

        Ok(Self {
            upload_root,
            quota_path,
            seat_plan_path,
            event_name,
            max_pages,
            max_file_bytes: max_file_mb * 1024 * 1024,
            attempts,
            attempt_timeout: Duration::from_secs(timeout_secs),
            retry_delay: Duration::from_secs(retry_secs),
            device,
            mode,
            text_rendering,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidFlag { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidFlag { key } => {
                write!(f, "{key} must be a boolean flag (true/false)")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
