//! 结构化日志模块
//!
//! 提供基于 tracing 的结构化日志功能。TUI 独占终端，因此日志写入文件；
//! CLI 未配置文件时写到 stderr。

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;
use crate::error::{ObservabilityError, Result};

/// 日志级别重新加载句柄类型
type ReloadHandle = Handle<EnvFilter, Registry>;

/// 日志管理器
///
/// 持有文件写入线程的 guard，drop 时刷新剩余日志，需存活到进程结束。
#[derive(Debug)]
pub struct LogManager {
    /// 配置
    config: LoggingConfig,

    /// 过滤器重新加载句柄
    reload_handle: ReloadHandle,

    /// 非阻塞文件写入 guard
    _guard: Option<WorkerGuard>,
}

impl LogManager {
    /// 安装全局 subscriber
    ///
    /// 进程内只能成功一次；已安装时返回 [`ObservabilityError::Logging`]。
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let filter = build_filter(config)?;
        let (filter, reload_handle) = reload::Layer::new(filter);

        let (writer, guard, ansi) = match &config.file_path {
            Some(path) => {
                let (writer, guard) = file_writer(path)?;
                (BoxMakeWriter::new(writer), Some(guard), false)
            }
            None => (BoxMakeWriter::new(std::io::stderr), None, config.ansi_colors),
        };

        let registry = tracing_subscriber::registry().with(filter);

        let installed = if config.json_format {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(config.include_target)
                .with_line_number(config.include_line_number)
                .with_ansi(false);
            registry.with(layer).try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(config.include_target)
                .with_line_number(config.include_line_number)
                .with_ansi(ansi);
            registry.with(layer).try_init()
        };
        installed.map_err(|e| ObservabilityError::logging(format!("Failed to install subscriber: {}", e)))?;

        tracing::info!(
            target: "puckchat_observability",
            "Logging initialized with level: {}",
            config.level
        );

        Ok(Self {
            config: config.clone(),
            reload_handle,
            _guard: guard,
        })
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::config(format!("Invalid log level: {}", e)))?;

        self.reload_handle
            .modify(|filter| *filter = new_filter)
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;
        self.config.level = level.to_string();

        tracing::info!(
            target: "puckchat_observability",
            "Log level updated to: {}",
            level
        );
        Ok(())
    }

    /// 获取当前配置
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }
}

/// 构建环境过滤器，RUST_LOG 优先
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if config.env_override {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ObservabilityError::config(format!("Invalid log level: {}", e)))?;

    // 添加模块级别的过滤器
    for (module, level) in &config.module_levels {
        filter = filter.add_directive(
            format!("{}={}", module, level)
                .parse()
                .map_err(|e| ObservabilityError::config(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ObservabilityError::config(format!("Invalid log file path: {:?}", path)))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| ObservabilityError::logging(format!("Failed to open log file: {}", e)))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// 创建带有会话上下文的 span
pub fn create_session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("session", session_id = %session_id)
}
