use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use url::Url;

/// Errors raised while assembling configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid URL in {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL of this service
    pub backend_url: Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub service_url: Url,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub queue: String,
    pub ack_mode: AckMode,
}

/// When the deletion listener acknowledges a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckMode {
    /// Ack only after the purge committed; failures are redelivered (at-least-once)
    AfterProcessing,
    /// Broker auto-acks on delivery; failures are logged and lost (best-effort)
    OnReceipt,
}

impl std::str::FromStr for AckMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "after-processing" | "after_processing" | "at-least-once" => Ok(AckMode::AfterProcessing),
            "on-receipt" | "on_receipt" | "auto" | "best-effort" => Ok(AckMode::OnReceipt),
            _ => Err(()),
        }
    }
}

impl BrokerConfig {
    pub fn amqp_uri(&self) -> String {
        format!("amqp://{}:{}/%2f", self.host, self.port)
    }
}

impl AppConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Presets are chosen by `APP_ENV`, then individual variables override them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let auth_raw = lookup("AUTH_SERVICE").ok_or(ConfigError::Missing("AUTH_SERVICE"))?;
        let service_url = parse_url("AUTH_SERVICE", &auth_raw)?;

        let preset = match environment {
            Environment::Production => Self::production(service_url)?,
            Environment::Development => Self::development(service_url)?,
        };

        preset.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database overrides
        if let Some(v) = lookup("DATABASE_URL").or_else(|| lookup("DATABASE_HABITS")) {
            self.database.url = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        // Server overrides
        if let Some(v) = lookup("HABITS_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        let backend = lookup("BACKEND").unwrap_or_else(|| format!("http://127.0.0.1:{}", self.server.port));
        self.server.backend_url = parse_url("BACKEND", &backend)?;

        // Auth overrides
        if let Some(v) = lookup("AUTH_TIMEOUT_SECS") {
            self.auth.timeout_secs = v.parse().unwrap_or(self.auth.timeout_secs);
        }

        // Broker overrides
        if let Some(v) = lookup("RABBIT_HOST") {
            self.broker.host = v;
        }
        if let Some(v) = lookup("RABBIT_PORT") {
            self.broker.port = v.parse().unwrap_or(self.broker.port);
        }
        if let Some(v) = lookup("RABBIT_CHANNEL").or_else(|| lookup("RABBIT_QUEUE")) {
            self.broker.queue = v;
        }
        if let Some(v) = lookup("LISTENER_ACK_MODE") {
            self.broker.ack_mode = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "LISTENER_ACK_MODE", value: v.clone() })?;
        }

        Ok(self)
    }

    fn development(service_url: Url) -> Result<Self, ConfigError> {
        Self::preset(Environment::Development, service_url, 5)
    }

    fn production(service_url: Url) -> Result<Self, ConfigError> {
        Self::preset(Environment::Production, service_url, 20)
    }

    fn preset(environment: Environment, service_url: Url, max_connections: u32) -> Result<Self, ConfigError> {
        let port = 8888;
        Ok(Self {
            environment,
            database: DatabaseConfig {
                url: "sqlite://habits.db?mode=rwc".to_string(),
                max_connections,
            },
            server: ServerConfig {
                port,
                backend_url: parse_url("BACKEND", &format!("http://127.0.0.1:{}", port))?,
            },
            auth: AuthConfig {
                service_url,
                timeout_secs: 5,
            },
            broker: BrokerConfig {
                host: "localhost".to_string(),
                port: 5672,
                queue: "habits".to_string(),
                ack_mode: AckMode::AfterProcessing,
            },
        })
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self.environment {
            Environment::Development => "habit_tracker=debug,tower_http=debug",
            Environment::Production => "habit_tracker=info,tower_http=info",
        }
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl { key, value: value.to_string() })
}
