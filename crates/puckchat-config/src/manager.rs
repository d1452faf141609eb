use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 配置管理器
///
/// `stored` 是文件中的内容，`effective` 是叠加环境变量后的结果；
/// 只有 `stored` 会被写回文件。
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    stored: Arc<RwLock<Config>>,
    effective: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// 加载配置文件，不存在时写入默认配置
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = if path.exists() {
            info!("Loading config from {:?}", path);
            Self::read_file(path).await?
        } else {
            info!("Config file not found, creating default config at {:?}", path);
            let default_config = Config::default();
            // 确保父目录存在
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&default_config)?;
            tokio::fs::write(path, &content).await?;
            default_config
        };

        Ok(Self::new(config, path.to_path_buf()))
    }

    /// 从默认位置加载配置
    pub async fn load_default() -> ConfigResult<Self> {
        let config_path = Self::default_config_path()?;
        Self::load(&config_path).await
    }

    /// 获取默认配置路径 (~/.puckchat/config.json)
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        crate::default_config_path()
            .ok_or_else(|| ConfigError::InvalidPath("Could not find home directory".to_string()))
    }

    /// 用给定的文件内容创建配置管理器
    pub fn new(config: Config, path: PathBuf) -> Self {
        let effective = Self::with_env_overrides(&config);
        Self {
            path,
            stored: Arc::new(RwLock::new(config)),
            effective: Arc::new(RwLock::new(effective)),
        }
    }

    /// 获取配置快照（含环境变量覆盖）
    pub async fn snapshot(&self) -> Config {
        self.effective.read().await.clone()
    }

    /// 保存配置到文件
    pub async fn save(&self) -> ConfigResult<()> {
        let config = self.stored.read().await;
        let content = serde_json::to_string_pretty(&*config)?;
        drop(config);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        info!("Config saved to {:?}", self.path);
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload(&self) -> ConfigResult<()> {
        if !self.path.exists() {
            return Err(ConfigError::InvalidPath(format!(
                "Config file not found: {:?}",
                self.path
            )));
        }

        let new_config = Self::read_file(&self.path).await?;
        self.replace(new_config).await;

        info!("Config reloaded from {:?}", self.path);
        Ok(())
    }

    /// 更新配置并保存
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config) -> ConfigResult<()>,
    {
        let mut candidate = self.stored.read().await.clone();
        f(&mut candidate)?;
        Self::validate(&candidate)?;
        self.replace(candidate).await;
        self.save().await
    }

    async fn replace(&self, config: Config) {
        let effective = Self::with_env_overrides(&config);
        *self.stored.write().await = config;
        *self.effective.write().await = effective;
    }

    async fn read_file(path: &Path) -> ConfigResult<Config> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::expand_env_vars(&content)?;
        let config: Config = serde_json::from_str(&content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    // 环境变量优先于文件内容，但不写回文件
    fn with_env_overrides(config: &Config) -> Config {
        let mut effective = config.clone();
        effective.apply_env_overrides();
        effective
    }

    /// 验证配置
    pub fn validate(config: &Config) -> ConfigResult<()> {
        let base_url = config.api.base_url.trim();
        if !base_url.is_empty()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                config.api.base_url
            )));
        }

        if config.api.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if config.storage.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.path cannot be empty".to_string(),
            ));
        }

        if let Some(option) = config
            .widget
            .quick_options
            .iter()
            .find(|o| o.query.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "Quick option '{}' has an empty query",
                option.label
            )));
        }

        Ok(())
    }

    /// 展开环境变量 ${VAR} 或 ${VAR:-default}
    fn expand_env_vars(content: &str) -> ConfigResult<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_expr = &cap[1];

            // 处理 ${VAR:-default} 语法
            let (var_name, default_value) = match var_expr.find(":-") {
                Some(pos) => (&var_expr[..pos], Some(&var_expr[pos + 2..])),
                None => (var_expr, None),
            };

            let replacement = match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
                },
            };

            result = result.replace(full_match, &replacement);
        }

        Ok(result)
    }

    /// 获取配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}
