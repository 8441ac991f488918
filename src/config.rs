use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Client configuration
    pub environment: String,
    pub log_level: String,

    // REST collaborator
    pub api_base_url: String,
    pub request_timeout_secs: u64,

    // Push connection
    pub socket_url: String,
    pub notification_namespace: String,
    pub reconnect_delay_ms: u64,
    pub reconnect_attempts: u32,

    // Notification feed
    pub notification_window_size: usize,
    pub unread_poll_interval_secs: u64,

    // Session storage
    pub session_file: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            socket_url: env::var("SOCKET_URL")
                .unwrap_or_else(|_| "ws://localhost:3000".to_string()),
            notification_namespace: env::var("NOTIFICATION_NAMESPACE")
                .unwrap_or_else(|_| "/notifications".to_string()),
            reconnect_delay_ms: env::var("RECONNECT_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            reconnect_attempts: env::var("RECONNECT_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            notification_window_size: env::var("NOTIFICATION_WINDOW_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            unread_poll_interval_secs: env::var("UNREAD_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            session_file: env::var("SESSION_FILE")
                .unwrap_or_else(|_| ".docflow/session.json".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn unread_poll_interval(&self) -> Duration {
        Duration::from_secs(self.unread_poll_interval_secs)
    }

    /// 推送连接的完整地址 (socket地址 + 通知命名空间)
    /// 命名空间追加在socket地址已有的路径之后
    pub fn push_endpoint(&self) -> anyhow::Result<url::Url> {
        let mut endpoint = url::Url::parse(&self.socket_url)?;
        endpoint
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("SOCKET_URL cannot carry a path: {}", self.socket_url))?
            .pop_if_empty()
            .extend(self.notification_namespace.split('/').filter(|segment| !segment.is_empty()));
        Ok(endpoint)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            api_base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: 30,
            socket_url: "ws://localhost:3000".to_string(),
            notification_namespace: "/notifications".to_string(),
            reconnect_delay_ms: 1000,
            reconnect_attempts: 5,
            notification_window_size: 10,
            unread_poll_interval_secs: 30,
            session_file: ".docflow/session.json".to_string(),
        }
    }
}
