//! 会话存储服务 - 业务能力层
//!
//! 只负责 Cookie 会话的持久化与加载，不关心流程

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SpiderError, SpiderResult};
use crate::models::session::Session;

/// 会话存储能力
///
/// 职责：
/// - load: 返回指定后端的有效会话，过期/损坏/后端不匹配都视为无会话
/// - save: 整体覆盖写入，不做合并
/// - 没有有效会话不是错误，流程会以未认证状态继续
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 加载指定后端的有效会话
    async fn load(&self, backend: &str) -> SpiderResult<Option<Session>>;

    /// 保存会话，整体覆盖之前的状态
    async fn save(&self, session: &Session) -> SpiderResult<()>;
}

/// 基于单个 JSON 文件的会话存储
pub struct FileSessionStore {
    file_path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, backend: &str) -> SpiderResult<Option<Session>> {
        if !self.file_path.exists() {
            debug!("会话文件不存在: {}", self.file_path.display());
            return Ok(None);
        }

        let content = match fs::read_to_string(&self.file_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("⚠️ 读取会话文件失败，视为无会话: {}", e);
                return Ok(None);
            }
        };

        // 损坏的会话文件只告警不中断，下次 save 会整体覆盖
        let session: Session = match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                warn!("⚠️ 会话文件损坏，视为无会话: {}", e);
                return Ok(None);
            }
        };

        if session.backend != backend {
            debug!(
                "会话属于后端 {} 而非 {}，视为无会话",
                session.backend, backend
            );
            return Ok(None);
        }

        if !session.is_valid(Utc::now()) {
            info!("会话已过期（捕获于 {}），需要重新验证", session.captured_at);
            return Ok(None);
        }

        info!("✓ 加载到有效会话: {} 条 Cookie", session.len());
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> SpiderResult<()> {
        let json = serde_json::to_string_pretty(session).map_err(|e| {
            SpiderError::Session(SessionError::JsonFailed {
                source: Box::new(e),
            })
        })?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    SpiderError::Session(SessionError::WriteFailed {
                        path: parent.display().to_string(),
                        source: Box::new(e),
                    })
                })?;
            }
        }

        fs::write(&self.file_path, json).await.map_err(|e| {
            SpiderError::Session(SessionError::WriteFailed {
                path: self.file_path.display().to_string(),
                source: Box::new(e),
            })
        })?;

        info!(
            "💾 会话已保存: {} 条 Cookie -> {}",
            session.len(),
            self.file_path.display()
        );
        Ok(())
    }
}

/// 内存会话存储，用于测试和嵌入场景
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, backend: &str) -> SpiderResult<Option<Session>> {
        let guard = self.inner.lock().await;
        match guard.as_ref() {
            Some(session) if session.backend == backend && session.is_valid(Utc::now()) => {
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> SpiderResult<()> {
        let mut guard = self.inner.lock().await;
        *guard = Some(session.clone());
        Ok(())
    }
}
