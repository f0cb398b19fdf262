//! 浏览器驱动层 - 页面自动化抽象
//!
//! 职责：
//! - 定义统一的页面自动化契约 BrowserDriver
//! - chromium 后端：通过 CDP 直接驱动本机 Chrome/Edge
//! - agent 后端：通过 agent-browser 命令行间接控制 Playwright
//!
//! 上层流程只依赖 trait，不感知后端差异

pub mod agent;
pub mod chromium;

use std::fmt;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{ConfigError, SpiderError, SpiderResult};
use crate::models::Session;

pub use agent::AgentDriver;
pub use chromium::ChromiumDriver;

/// Cookie 未带域时的缺省域，微信文章页的 Cookie 基本都挂在这里
pub(crate) const DEFAULT_COOKIE_DOMAIN: &str = ".weixin.qq.com";

/// 浏览器后端标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// chromiumoxide 直连本机浏览器
    Chromium,
    /// agent-browser CLI 子进程
    Agent,
}

impl Backend {
    /// 解析配置中的后端名称
    ///
    /// # 参数
    /// * `value` - 配置值，大小写不敏感
    ///
    /// # 返回
    /// * `Ok(Backend)` - 识别成功
    /// * `Err(SpiderError)` - 名称不在支持列表中
    pub fn parse(value: &str) -> SpiderResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Backend::Chromium),
            "agent" | "agent-browser" => Ok(Backend::Agent),
            other => Err(SpiderError::Config(ConfigError::UnknownBackend {
                value: other.to_string(),
            })),
        }
    }

    /// 会话文件中记录的后端标识字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Chromium => "chromium",
            Backend::Agent => "agent",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 页面自动化能力契约
///
/// 方法都取 &mut self：一个驱动同一时刻只服务一次抓取，
/// 批量抓取按顺序复用同一个驱动实例
#[async_trait]
pub trait BrowserDriver: Send {
    /// 导航到目标 URL（只发起导航，不等待加载完成）
    async fn navigate(&mut self, url: &str) -> SpiderResult<()>;

    /// 等待页面加载完成，并留出动态内容渲染时间
    ///
    /// 超过 timeout_secs 仍未加载完成时返回 Timeout 错误
    async fn wait_for_load(&mut self, timeout_secs: u64) -> SpiderResult<()>;

    /// 抓取当前页面的完整 DOM 快照（HTML 字符串）
    ///
    /// 后续的检测与提取都只作用于这份快照，同一份快照多次
    /// 解析结果一致
    async fn dom_snapshot(&mut self) -> SpiderResult<String>;

    /// 导出当前浏览器的 Cookie 为会话
    async fn get_cookies(&mut self) -> SpiderResult<Session>;

    /// 把会话中的 Cookie 应用到浏览器
    async fn set_cookies(&mut self, session: &Session) -> SpiderResult<()>;

    /// 释放浏览器资源，驱动不可再使用
    async fn close(&mut self) -> SpiderResult<()>;

    /// 驱动所属的后端
    fn backend(&self) -> Backend;
}

/// 根据配置构建对应后端的驱动
pub async fn build_driver(config: &Config) -> SpiderResult<Box<dyn BrowserDriver>> {
    match Backend::parse(&config.backend)? {
        Backend::Chromium => Ok(Box::new(ChromiumDriver::new(config).await?)),
        Backend::Agent => Ok(Box::new(AgentDriver::new(config))),
    }
}
