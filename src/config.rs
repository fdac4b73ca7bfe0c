/// Configuration management for the Folio moderation service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub pagination: PaginationConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// User ids that always act as admin, whatever their stored role
    pub admin_user_ids: Vec<String>,
}

/// Page size bounds for list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Email configuration
///
/// SMTP and the HTTP API are both optional; whichever is present becomes a
/// delivery strategy, SMTP ports first and in the configured order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub from_address: String,
    pub smtp: Option<SmtpConfig>,
    pub api: Option<EmailApiConfig>,
    pub attempt_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub ports: Vec<u16>,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailApiConfig {
    pub url: String,
    pub api_key: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub anonymous_rps: u32,
    pub admin_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// JSON lines instead of the human-readable format
    pub json: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("FOLIO_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("FOLIO_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;

        let database_path: PathBuf = env::var("FOLIO_DATABASE_PATH")
            .unwrap_or_else(|_| "./data/folio.sqlite".to_string())
            .into();

        let jwt_secret = env::var("FOLIO_JWT_SECRET")
            .map_err(|_| AppError::Validation("FOLIO_JWT_SECRET is required".to_string()))?;
        let admin_user_ids = env_list("FOLIO_ADMIN_USER_IDS");

        let pagination = PaginationConfig {
            default_limit: env_or("FOLIO_PAGE_DEFAULT_LIMIT", 20),
            max_limit: env_or("FOLIO_PAGE_MAX_LIMIT", 100),
        };

        let smtp = env::var("FOLIO_SMTP_HOST").ok().map(|host| {
            let mut ports: Vec<u16> = env_list("FOLIO_SMTP_PORTS")
                .iter()
                .filter_map(|p| p.parse().ok())
                .collect();
            if ports.is_empty() {
                ports = vec![587, 465, 25];
            }
            SmtpConfig {
                host,
                ports,
                username: env::var("FOLIO_SMTP_USERNAME").unwrap_or_default(),
                password: env::var("FOLIO_SMTP_PASSWORD").unwrap_or_default(),
            }
        });

        let api = match (
            env::var("FOLIO_EMAIL_API_URL"),
            env::var("FOLIO_EMAIL_API_KEY"),
        ) {
            (Ok(url), Ok(api_key)) => Some(EmailApiConfig { url, api_key }),
            _ => None,
        };

        let email = if smtp.is_some() || api.is_some() {
            Some(EmailConfig {
                from_address: env::var("FOLIO_EMAIL_FROM")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
                smtp,
                api,
                attempt_timeout_secs: env_or("FOLIO_EMAIL_TIMEOUT_SECS", 10),
            })
        } else {
            None
        };

        let rate_limit = RateLimitSettings {
            enabled: env_or("FOLIO_RATE_LIMITS_ENABLED", true),
            authenticated_rps: env_or("FOLIO_RATE_LIMIT_AUTHENTICATED_RPS", 100),
            anonymous_rps: env_or("FOLIO_RATE_LIMIT_ANONYMOUS_RPS", 10),
            admin_rps: env_or("FOLIO_RATE_LIMIT_ADMIN_RPS", 1000),
            burst_size: env_or("FOLIO_RATE_LIMIT_BURST", 50),
        };

        let logging = LoggingConfig {
            json: env::var("FOLIO_LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig { database_path },
            authentication: AuthConfig {
                jwt_secret,
                admin_user_ids,
            },
            pagination,
            email,
            rate_limit,
            logging,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.pagination.max_limit == 0
            || self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(AppError::Validation(
                "Page limits must satisfy 0 < default <= max".to_string(),
            ));
        }

        if let Some(email) = &self.email {
            if email.attempt_timeout_secs == 0 {
                return Err(AppError::Validation(
                    "Email attempt timeout must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Configuration for tests and local tooling
    pub fn for_testing(jwt_secret: &str) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                database_path: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: jwt_secret.to_string(),
                admin_user_ids: Vec::new(),
            },
            pagination: PaginationConfig::default(),
            email: None,
            rate_limit: RateLimitSettings {
                enabled: false,
                authenticated_rps: 100,
                anonymous_rps: 10,
                admin_rps: 1000,
                burst_size: 50,
            },
            logging: LoggingConfig { json: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_validate_accepts_testing_config() {
        assert!(ServerConfig::for_testing(SECRET).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = ServerConfig::for_testing("short");
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_page_limits() {
        let mut config = ServerConfig::for_testing(SECRET);
        config.pagination = PaginationConfig {
            default_limit: 200,
            max_limit: 100,
        };
        assert!(config.validate().is_err());
    }
}
