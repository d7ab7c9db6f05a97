/// Configuration management for the FixMyStreet API
use crate::error::{FmsError, FmsResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Longest accepted token lifetime (about 100 years)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 100 * 365 * 24 * 60;

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub uploads: UploadConfig,
    pub analyzer: AnalyzerConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL used when building links to stored images
    pub public_url: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 8000,
            public_url: "http://127.0.0.1:8000".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Root for publicly served uploads (images live under `complaints/`)
    pub upload_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_directory = PathBuf::from("./data");
        Self {
            database: data_directory.join("fixmystreet.sqlite"),
            upload_directory: data_directory.join("public"),
            data_directory,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token lifetime; `None` means tokens never expire
    pub token_ttl_minutes: Option<i64>,
    /// Restrict report listing and updates to admin users
    pub reports_require_admin: bool,
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_image_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5048 * 1024,
        }
    }
}

/// External damage analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000/analyze".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests per second for requests carrying a bearer token
    pub authenticated_rps: u32,
    /// Requests per second for anonymous requests
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            authenticated_rps: 50,
            unauthenticated_rps: 10,
            burst_size: 20,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "fixmystreet=debug,tower_http=debug".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> FmsResult<Self> {
        dotenv::dotenv().ok();

        let defaults = ServerConfig::default();

        let hostname = env::var("FMS_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = match env::var("FMS_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| FmsError::Config(format!("Invalid port number: {}", raw)))?,
            Err(_) => defaults.service.port,
        };
        let public_url = env::var("FMS_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port))
            .trim_end_matches('/')
            .to_string();

        let data_directory: PathBuf = env::var("FMS_DATA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.data_directory);
        let database = env::var("FMS_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("fixmystreet.sqlite"));
        let upload_directory = env::var("FMS_UPLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("public"));

        let max_image_bytes = env::var("FMS_MAX_IMAGE_KB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|kb| kb * 1024)
            .unwrap_or(defaults.uploads.max_image_bytes);

        let token_ttl_minutes = env::var("FMS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|m| *m > 0);
        let reports_require_admin = env_flag("FMS_REPORTS_REQUIRE_ADMIN", false);

        let analyzer_url = env::var("FMS_ANALYZER_URL").unwrap_or(defaults.analyzer.url);
        let analyzer_timeout = env::var("FMS_ANALYZER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.analyzer.timeout_secs);

        let rate_limit = RateLimitConfig {
            enabled: env_flag("FMS_RATE_LIMITS_ENABLED", defaults.rate_limit.enabled),
            authenticated_rps: env::var("FMS_RATE_LIMIT_AUTHENTICATED_RPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit.authenticated_rps),
            unauthenticated_rps: env::var("FMS_RATE_LIMIT_UNAUTHENTICATED_RPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit.unauthenticated_rps),
            burst_size: env::var("FMS_RATE_LIMIT_BURST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit.burst_size),
        };

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);
        let log_format = match env::var("FMS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version: defaults.service.version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                upload_directory,
            },
            authentication: AuthConfig {
                token_ttl_minutes,
                reports_require_admin,
            },
            uploads: UploadConfig { max_image_bytes },
            analyzer: AnalyzerConfig {
                url: analyzer_url,
                timeout_secs: analyzer_timeout,
            },
            rate_limit,
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> FmsResult<()> {
        if self.service.hostname.is_empty() {
            return Err(FmsError::Config("Hostname cannot be empty".to_string()));
        }

        if self.uploads.max_image_bytes == 0 {
            return Err(FmsError::Config(
                "Maximum image size must be greater than zero".to_string(),
            ));
        }

        reqwest::Url::parse(&self.analyzer.url).map_err(|e| {
            FmsError::Config(format!("Invalid analyzer URL {}: {}", self.analyzer.url, e))
        })?;

        if let Some(minutes) = self.authentication.token_ttl_minutes {
            if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
                return Err(FmsError::Config(format!(
                    "Token lifetime must be between 1 and {} minutes, got {}",
                    MAX_TOKEN_TTL_MINUTES, minutes
                )));
            }
        }

        if self.analyzer.timeout_secs == 0 {
            return Err(FmsError::Config(
                "Analyzer timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
