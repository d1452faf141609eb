//! # Storage Error Types
//!
//! 定义本地存储相关的错误类型。

use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 存储文件内容损坏
    #[error("Corrupt storage file {path}: {message}")]
    Corrupt { path: String, message: String },
}

impl StorageError {
    /// 创建损坏错误
    pub fn corrupt(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// 存储结果类型
pub type StorageResult<T> = Result<T, StorageError>;
