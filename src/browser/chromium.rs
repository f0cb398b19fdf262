//! chromium 后端 - 通过 CDP 直接驱动本机浏览器
//!
//! 两种接入方式：
//! - 启动新的无头浏览器（默认，BROWSER_DEBUG_PORT=0）
//! - 附加到已开调试端口的浏览器（人工完成验证后接管会话）

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::browser::{Backend, BrowserDriver, DEFAULT_COOKIE_DOMAIN};
use crate::config::Config;
use crate::error::{DriverError, SpiderError, SpiderResult};
use crate::models::{Cookie, Session};

/// CDP 后端驱动
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// 是否由本进程启动（附加模式关闭时不杀浏览器）
    launched: bool,
    settle_secs: u64,
    session_ttl_secs: u64,
    current_url: String,
}

impl ChromiumDriver {
    /// 根据配置启动或附加浏览器
    ///
    /// # 参数
    /// * `config` - browser_debug_port 为 0 时启动新的无头浏览器，
    ///   否则附加到该端口上已开启远程调试的浏览器
    pub async fn new(config: &Config) -> SpiderResult<Self> {
        let launched = config.browser_debug_port == 0;
        let (browser, page, handler_task) = if launched {
            Self::launch(config).await?
        } else {
            Self::attach(config).await?
        };

        Ok(Self {
            browser,
            page,
            handler_task,
            launched,
            settle_secs: config.dynamic_wait_secs,
            session_ttl_secs: config.session_ttl_hours * 3600,
            current_url: String::new(),
        })
    }

    /// 启动新的无头浏览器
    async fn launch(config: &Config) -> SpiderResult<(Browser, Page, JoinHandle<()>)> {
        info!("🚀 启动无头浏览器...");

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .args(vec![
                "--disable-gpu",             // Windows 无头模式必须禁用 GPU
                "--no-sandbox",              // 禁用沙盒，防止权限问题导致的崩溃
                "--disable-dev-shm-usage",   // 防止共享内存不足
                "--remote-debugging-port=0", // 让浏览器自动选择端口
            ]);
        if !config.chrome_executable.is_empty() {
            builder = builder.chrome_executable(Path::new(&config.chrome_executable));
        }
        let browser_config = builder.build().map_err(|e| {
            SpiderError::Driver(DriverError::ConfigurationFailed { detail: e })
        })?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            SpiderError::Driver(DriverError::LaunchFailed {
                source: Box::new(e),
            })
        })?;
        debug!("无头浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let page = browser.new_page("about:blank").await.map_err(|e| {
            SpiderError::Driver(DriverError::PageCreationFailed {
                source: Box::new(e),
            })
        })?;

        info!("✅ 无头浏览器就绪");
        Ok((browser, page, handler_task))
    }

    /// 附加到已开调试端口的浏览器
    ///
    /// 优先复用已打开的标签页，让人工验证留下的页面上下文得以延续
    async fn attach(config: &Config) -> SpiderResult<(Browser, Page, JoinHandle<()>)> {
        let browser_url = format!("http://localhost:{}", config.browser_debug_port);
        info!("正在连接到浏览器: {}", browser_url);

        let (browser, mut handler) = Browser::connect(&browser_url)
            .await
            .map_err(|e| SpiderError::connection_failed(config.browser_debug_port, e))?;
        debug!("浏览器连接成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let pages = browser.pages().await?;
        debug!("获取到 {} 个页面", pages.len());

        let page = if let Some(existing) = pages.into_iter().next() {
            debug!("复用已打开的标签页");
            existing
        } else {
            browser.new_page("about:blank").await.map_err(|e| {
                SpiderError::Driver(DriverError::PageCreationFailed {
                    source: Box::new(e),
                })
            })?
        };

        info!("✓ 已附加到调试端口 {}", config.browser_debug_port);
        Ok((browser, page, handler_task))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> SpiderResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| SpiderError::navigation_failed(url, e))?;
        self.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_load(&mut self, timeout_secs: u64) -> SpiderResult<()> {
        match timeout(
            Duration::from_secs(timeout_secs),
            self.page.wait_for_navigation(),
        )
        .await
        {
            Ok(Ok(_)) => debug!("页面加载完成"),
            Ok(Err(e)) => return Err(SpiderError::navigation_failed(&self.current_url, e)),
            Err(_) => return Err(SpiderError::timeout(&self.current_url, timeout_secs)),
        }

        // 等待 JS 渲染动态内容
        if self.settle_secs > 0 {
            sleep(Duration::from_secs(self.settle_secs)).await;
        }
        Ok(())
    }

    async fn dom_snapshot(&mut self) -> SpiderResult<String> {
        let html = self.page.content().await?;
        debug!("获取 DOM 快照: {} 字节", html.len());
        Ok(html)
    }

    async fn get_cookies(&mut self) -> SpiderResult<Session> {
        let cdp_cookies = self.page.get_cookies().await?;
        let cookies: Vec<Cookie> = cdp_cookies
            .into_iter()
            .map(|c| {
                let expires = c.expires;
                Cookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                    // 会话级 Cookie 的 expires 为 -1
                    expires: (expires > 0.0).then_some(expires),
                    http_only: c.http_only,
                    secure: c.secure,
                }
            })
            .collect();

        debug!("导出 {} 条 Cookie", cookies.len());
        Ok(Session::new(
            Backend::Chromium.as_str(),
            cookies,
            self.session_ttl_secs,
        ))
    }

    async fn set_cookies(&mut self, session: &Session) -> SpiderResult<()> {
        if session.is_empty() {
            return Ok(());
        }

        let params: Vec<CookieParam> = session
            .cookies
            .iter()
            .map(|c| {
                let mut param = CookieParam::new(c.name.clone(), c.value.clone());
                param.domain = Some(if c.domain.is_empty() {
                    DEFAULT_COOKIE_DOMAIN.to_string()
                } else {
                    c.domain.clone()
                });
                param.path = Some(c.path.clone());
                param.expires = c.expires.map(TimeSinceEpoch::new);
                param.http_only = Some(c.http_only);
                param.secure = Some(c.secure);
                param
            })
            .collect();

        let count = params.len();
        self.page.set_cookies(params).await?;
        info!("✓ 已应用 {} 条 Cookie", count);
        Ok(())
    }

    async fn close(&mut self) -> SpiderResult<()> {
        if self.launched {
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler_task.abort();
        info!("🛑 浏览器驱动已关闭");
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Chromium
    }
}
