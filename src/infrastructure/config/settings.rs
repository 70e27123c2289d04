use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Message lifecycle settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// How long a message stays visible after it is created, in seconds
    #[serde(default = "default_message_lifetime")]
    pub message_lifetime_seconds: u64,
    /// Interval between expiry sweeps in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Maximum number of messages returned by the history endpoint
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Capacity of each session's outbound queue; a full queue evicts the session
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// Capacity of the hub's event mailbox
    #[serde(default = "default_hub_queue_size")]
    pub hub_queue_size: usize,
    /// Grace period for the write pump to flush and close after the read side ends
    #[serde(default = "default_write_drain_timeout")]
    pub write_drain_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Storage backend: "memory" or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
    /// Table holding chat messages
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_message_lifetime() -> u64 {
    60 // 1 minute
}

fn default_sweep_interval() -> u64 {
    10
}

fn default_history_page_size() -> usize {
    50
}

fn default_outbound_queue_size() -> usize {
    32
}

fn default_hub_queue_size() -> usize {
    1024
}

fn default_write_drain_timeout() -> u64 {
    5000
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/chat_db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    10
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_table() -> String {
    "chat_messages".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "ara-chat-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("chat.message_lifetime_seconds", default_message_lifetime() as i64)?
            .set_default("chat.sweep_interval_seconds", default_sweep_interval() as i64)?
            .set_default("chat.history_page_size", default_history_page_size() as i64)?
            .set_default("store.backend", default_store_backend())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // APP__SERVER__PORT, APP__CHAT__MESSAGE_LIFETIME_SECONDS, APP__DATABASE__URL, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would break the message lifecycle invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.message_lifetime_seconds == 0 {
            return Err(ConfigError::Message(
                "chat.message_lifetime_seconds must be greater than zero".into(),
            ));
        }
        if self.chat.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "chat.sweep_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.chat.history_page_size == 0 {
            return Err(ConfigError::Message(
                "chat.history_page_size must be greater than zero".into(),
            ));
        }
        if self.websocket.outbound_queue_size == 0 || self.websocket.hub_queue_size == 0 {
            return Err(ConfigError::Message(
                "websocket queue sizes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ChatConfig {
    pub fn message_lifetime(&self) -> Duration {
        Duration::from_secs(self.message_lifetime_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl WebSocketConfig {
    pub fn write_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.write_drain_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            message_lifetime_seconds: default_message_lifetime(),
            sweep_interval_seconds: default_sweep_interval(),
            history_page_size: default_history_page_size(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_queue_size: default_outbound_queue_size(),
            hub_queue_size: default_hub_queue_size(),
            write_drain_timeout_ms: default_write_drain_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            table: default_table(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8090);
        assert_eq!(settings.chat.message_lifetime(), Duration::from_secs(60));
        assert_eq!(settings.chat.sweep_interval(), Duration::from_secs(10));
        assert_eq!(settings.chat.history_page_size, 50);
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.database.table, "chat_messages");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let mut settings = Settings::default();
        settings.chat.message_lifetime_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let mut settings = Settings::default();
        settings.websocket.outbound_queue_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8090");
    }
}
