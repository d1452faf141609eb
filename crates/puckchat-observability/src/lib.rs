//! puckchat Observability
//!
//! 为 puckchat 二进制程序提供统一的日志初始化。

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::LoggingConfig;
pub use error::{ObservabilityError, Result};
pub use logging::{build_filter, create_session_span, LogManager};

/// 按 puckchat 配置文件的 `logging` 段初始化日志
pub fn init_from_config(config: &puckchat_config::LoggingConfig) -> Result<LogManager> {
    LogManager::init(&LoggingConfig::from(config))
}

/// 便捷导入模块
pub mod prelude {
    //! 常用类型的便捷导入

    pub use crate::{LogManager, LoggingConfig, Result};

    // 日志
    pub use tracing::{debug, error, info, instrument, trace, warn, Span};
}
