//! 日志配置

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别（EnvFilter 语法）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否使用 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志文件路径，未设置时输出到 stderr
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// 模块级别的日志配置
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// 是否启用 ANSI 颜色（写文件时始终关闭）
    #[serde(default = "default_true")]
    pub ansi_colors: bool,

    /// 是否包含目标模块
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// 是否包含行号
    #[serde(default)]
    pub include_line_number: bool,

    /// 是否允许 RUST_LOG 覆盖级别
    #[serde(default = "default_true")]
    pub env_override: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
            module_levels: HashMap::new(),
            ansi_colors: true,
            include_target: true,
            include_line_number: false,
            env_override: true,
        }
    }
}

impl LoggingConfig {
    /// 设置日志级别
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// 设置 JSON 格式
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.json_format = json;
        self
    }

    /// 设置日志文件
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// 设置模块日志级别
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.module_levels.insert(module.into(), level.into());
        self
    }

    /// 关闭 RUST_LOG 覆盖
    pub fn without_env_override(mut self) -> Self {
        self.env_override = false;
        self
    }
}

/// 从 puckchat 配置文件的 `logging` 段转换
impl From<&puckchat_config::LoggingConfig> for LoggingConfig {
    fn from(config: &puckchat_config::LoggingConfig) -> Self {
        let file_path = config
            .file
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .map(puckchat_config::expand_tilde);

        Self {
            level: config.level.to_string(),
            json_format: config.json,
            file_path,
            // HTTP 客户端内部日志过于冗长
            module_levels: HashMap::from([
                ("hyper".to_string(), "warn".to_string()),
                ("reqwest".to_string(), "warn".to_string()),
            ]),
            ..Default::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use puckchat_config::LogLevel;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.file_path.is_none());
        assert!(config.env_override);
    }

    #[test]
    fn test_from_puckchat_config() {
        let source = puckchat_config::LoggingConfig {
            level: LogLevel::Debug,
            file: Some("/tmp/puckchat/test.log".to_string()),
            json: true,
        };

        let config = LoggingConfig::from(&source);
        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/puckchat/test.log")));
        assert_eq!(config.module_levels.get("reqwest").map(String::as_str), Some("warn"));
    }

    #[test]
    fn test_blank_file_means_stderr() {
        let source = puckchat_config::LoggingConfig {
            level: LogLevel::Info,
            file: Some("  ".to_string()),
            json: false,
        };
        assert!(LoggingConfig::from(&source).file_path.is_none());
    }
}
