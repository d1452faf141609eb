//! # SessionStore
//!
//! 会话标识与界面偏好的类型化访问层。
//!
//! 只持久化两个键：会话 ID 与快捷选项折叠状态。

use std::sync::Arc;

use puckchat_core::SessionId;
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::storage::KeyValueStore;

/// 会话 ID 的存储键
pub const SESSION_ID_KEY: &str = "chatSessionId";
/// 快捷选项折叠状态的存储键
pub const QUICK_OPTIONS_COLLAPSED_KEY: &str = "quickOptionsCollapsed";

/// 注入到客户端的持久化会话存储
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// 读取已持久化的会话 ID（空值视为不存在）
    pub async fn session_id(&self) -> StorageResult<Option<SessionId>> {
        let raw = self.backend.get(SESSION_ID_KEY).await?;
        Ok(raw.as_deref().and_then(SessionId::parse))
    }

    /// 读取会话 ID，不存在时生成并持久化
    ///
    /// 对同一存储重复调用总是返回同一个 ID，直到 [`Self::rotate_session`]。
    pub async fn initialize_session(&self) -> StorageResult<SessionId> {
        if let Some(existing) = self.session_id().await? {
            debug!("Reusing persisted session {}", existing.short());
            return Ok(existing);
        }

        let id = SessionId::generate();
        self.backend.set(SESSION_ID_KEY, id.as_str()).await?;
        info!("Created new chat session {}", id.short());
        Ok(id)
    }

    /// 生成新的会话 ID 并替换旧值
    pub async fn rotate_session(&self) -> StorageResult<SessionId> {
        let id = SessionId::generate();
        self.backend.set(SESSION_ID_KEY, id.as_str()).await?;
        info!("Rotated chat session to {}", id.short());
        Ok(id)
    }

    /// 快捷选项是否折叠（缺省为展开）
    pub async fn quick_options_collapsed(&self) -> StorageResult<bool> {
        let raw = self.backend.get(QUICK_OPTIONS_COLLAPSED_KEY).await?;
        Ok(raw.map(|v| v.trim() == "true").unwrap_or(false))
    }

    /// 持久化快捷选项折叠状态
    pub async fn set_quick_options_collapsed(&self, collapsed: bool) -> StorageResult<()> {
        self.backend
            .set(QUICK_OPTIONS_COLLAPSED_KEY, if collapsed { "true" } else { "false" })
            .await
    }
}
