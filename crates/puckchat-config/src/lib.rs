pub mod config;
pub mod manager;

pub use config::{
    ApiConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, StorageConfig,
    WidgetConfig, API_URL_ENV,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 puckchat 配置目录路径
pub fn puckchat_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".puckchat"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    puckchat_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认本地存储文件路径
pub fn default_storage_path() -> Option<PathBuf> {
    puckchat_dir().map(|dir| dir.join("storage.json"))
}

/// 获取默认日志文件路径
pub fn default_log_path() -> Option<PathBuf> {
    puckchat_dir().map(|dir| dir.join("logs").join("puckchat.log"))
}

/// 初始化 puckchat 目录结构
pub async fn init_puckchat_dirs() -> ConfigResult<()> {
    if let Some(root) = puckchat_dir() {
        tokio::fs::create_dir_all(&root).await?;
        tokio::fs::create_dir_all(root.join("logs")).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
