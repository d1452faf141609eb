use puckchat_core::{default_quick_options, QuickOption};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "PUCKCHAT_API_URL";

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api: ApiConfig::default(),
            widget: WidgetConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["api", "base_url"] => Some(self.api.base_url.clone()),
            ["api", "timeout_seconds"] => Some(self.api.timeout_seconds.to_string()),
            ["widget", "welcome_message"] => Some(self.widget.welcome_message.clone()),
            ["widget", "apology_message"] => Some(self.widget.apology_message.clone()),
            ["widget", "send_failed_message"] => Some(self.widget.send_failed_message.clone()),
            ["widget", "clear_failed_message"] => Some(self.widget.clear_failed_message.clone()),
            ["widget", "rate_failed_message"] => Some(self.widget.rate_failed_message.clone()),
            ["widget", "quick_options"] => serde_json::to_string(&self.widget.quick_options).ok(),
            ["storage", "path"] => Some(self.storage.path.clone()),
            ["logging", "level"] => Some(self.logging.level.to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json"] => Some(self.logging.json.to_string()),
            _ => None,
        }
    }

    /// 设置配置值
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["api", "base_url"] => {
                self.api.base_url = value.trim_end_matches('/').to_string();
            }
            ["api", "timeout_seconds"] => {
                self.api.timeout_seconds = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["widget", "welcome_message"] => {
                self.widget.welcome_message = value.to_string();
            }
            ["widget", "apology_message"] => {
                self.widget.apology_message = value.to_string();
            }
            ["widget", "send_failed_message"] => {
                self.widget.send_failed_message = value.to_string();
            }
            ["widget", "clear_failed_message"] => {
                self.widget.clear_failed_message = value.to_string();
            }
            ["widget", "rate_failed_message"] => {
                self.widget.rate_failed_message = value.to_string();
            }
            ["widget", "quick_options"] => {
                self.widget.quick_options = serde_json::from_str(value)?;
            }
            ["storage", "path"] => {
                self.storage.path = value.to_string();
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            ["logging", "json"] => {
                self.logging.json = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.trim_end_matches('/').to_string();
            }
        }
    }
}

/// 后端 API 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL the `/chat`, `/clear`, `/rate` and `/health` paths are appended to
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// 聊天窗口文案与快捷选项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetConfig {
    pub welcome_message: String,
    /// Appended to the conversation when a send fails
    pub apology_message: String,
    pub send_failed_message: String,
    pub clear_failed_message: String,
    pub rate_failed_message: String,
    #[serde(default = "default_quick_options")]
    pub quick_options: Vec<QuickOption>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            welcome_message: "👋 Ahoj! Jsem váš asistent pro hokejlogic.cz. Jak vám mohu pomoci?"
                .to_string(),
            apology_message: "Omlouvám se, došlo k chybě. Zkuste to prosím znovu.".to_string(),
            send_failed_message: "Failed to send message".to_string(),
            clear_failed_message: "Failed to clear conversation".to_string(),
            rate_failed_message: "Failed to rate message".to_string(),
            quick_options: default_quick_options(),
        }
    }
}

/// 本地持久化存储配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// JSON file holding the session id and UI preferences
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.puckchat/storage.json".to_string(),
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: Some("~/.puckchat/logs/puckchat.log".to_string()),
            json: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
