//! # puckchat Session Storage
//!
//! 聊天窗口的客户端持久化状态。
//!
//! ## 功能特性
//!
//! - **会话标识**：首次使用时生成，跨重启复用，清空对话时轮换
//! - **界面偏好**：快捷选项折叠状态
//! - **可注入后端**：内存存储（测试）或 JSON 文件存储
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use puckchat_session::{JsonFileStore, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SessionStore::new(Arc::new(JsonFileStore::new("~/.puckchat/storage.json")));
//!     let session_id = store.initialize_session().await?;
//!     println!("session: {}", session_id);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file_store;
pub mod session_store;
pub mod storage;

// 重新导出主要类型
pub use error::{StorageError, StorageResult};
pub use file_store::JsonFileStore;
pub use session_store::{SessionStore, QUICK_OPTIONS_COLLAPSED_KEY, SESSION_ID_KEY};
pub use storage::{KeyValueStore, MemoryStore};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
