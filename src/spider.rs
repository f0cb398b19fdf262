//! 爬虫门面 - 应用层
//!
//! 把浏览器驱动、会话存储、抓取流程和批量编排组装成对外的
//! 单一入口。典型用法：
//!
//! ```text
//! initialize → crawl / analyze / batch_crawl / compare → close
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::{self, BrowserDriver};
use crate::config::Config;
use crate::models::{
    load_batch_task, AnalyzedArticle, Article, ArticleSummary, BatchOutcome, BatchResult,
    ComparisonReport, Cookie, Session,
};
use crate::orchestrator::BatchCrawler;
use crate::services::{ArticleAnalyzer, ComparisonAnalyzer, FileSessionStore, SessionStore};
use crate::utils::logging;
use crate::workflow::{CrawlCtx, CrawlFlow};

/// 对比抓取允许的 URL 数量范围
const COMPARE_MIN_URLS: usize = 2;
const COMPARE_MAX_URLS: usize = 5;

/// 微信文章爬虫门面
///
/// 持有浏览器驱动与会话存储，同一实例的操作串行执行
pub struct WeixinSpider {
    config: Config,
    driver: Box<dyn BrowserDriver>,
    session_store: Box<dyn SessionStore>,
    flow: CrawlFlow,
    analyzer: ArticleAnalyzer,
    cancel: CancellationToken,
}

impl WeixinSpider {
    /// 初始化爬虫
    ///
    /// 按配置构建后端驱动，并尝试恢复上次保存的会话
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config.backend);

        let driver = browser::build_driver(&config)
            .await
            .context("构建浏览器驱动失败")?;
        let store = Box::new(FileSessionStore::new(&config.session_file));

        let mut spider = Self::assemble(config, driver, store)?;
        spider.restore_session().await?;
        Ok(spider)
    }

    /// 组装爬虫（驱动与存储由调用方提供）
    fn assemble(
        config: Config,
        driver: Box<dyn BrowserDriver>,
        session_store: Box<dyn SessionStore>,
    ) -> Result<Self> {
        let flow = CrawlFlow::new(&config).context("初始化抓取流程失败")?;
        Ok(Self {
            config,
            driver,
            session_store,
            flow,
            analyzer: ArticleAnalyzer::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// 批量任务的取消令牌，调用方持有后可随时停止
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 抓取单篇文章（是否下图由配置决定）
    pub async fn crawl(&mut self, url: &str) -> Result<Article> {
        self.crawl_with_options(url, self.config.download_images, None)
            .await
    }

    /// 抓取单篇文章，显式指定是否下载图片及图片目录名
    pub async fn crawl_with_options(
        &mut self,
        url: &str,
        download_images: bool,
        custom_dir: Option<&str>,
    ) -> Result<Article> {
        let mut ctx = CrawlCtx::single(url, download_images);
        if let Some(dir) = custom_dir {
            ctx = ctx.with_custom_dir(dir);
        }
        let article = self.flow.run(self.driver.as_mut(), &ctx).await?;

        // 抓取成功说明会话可用，保存下来供下次运行复用
        self.save_session().await;

        Ok(article)
    }

    /// 抓取并分析单篇文章（不下载图片）
    pub async fn analyze(&mut self, url: &str) -> Result<AnalyzedArticle> {
        let article = self.crawl_with_options(url, false, None).await?;
        let analysis = self.analyzer.analyze(&article)?;
        Ok(AnalyzedArticle { article, analysis })
    }

    /// 抓取单篇文章并生成摘要视图（不下载图片）
    pub async fn summarize(&mut self, url: &str) -> Result<ArticleSummary> {
        let article = self.crawl_with_options(url, false, None).await?;
        Ok(article.to_summary())
    }

    /// 批量抓取一组 URL
    pub async fn batch_crawl(
        &mut self,
        urls: &[String],
        download_images: bool,
    ) -> Result<BatchResult> {
        let crawler = BatchCrawler::with_cancel_token(&self.config, self.cancel.clone());
        let result = crawler
            .run(&self.flow, self.driver.as_mut(), urls, download_images)
            .await;

        self.save_session().await;
        Ok(result)
    }

    /// 从 TOML 任务文件批量抓取
    ///
    /// 任务文件中的 download_images / max_articles 覆盖全局配置
    pub async fn batch_crawl_from_task(&mut self, path: &Path) -> Result<BatchResult> {
        info!("📁 读取批量任务: {}", path.display());
        let task = load_batch_task(path).await?;
        let download_images = task.download_images.unwrap_or(self.config.download_images);

        let mut config = self.config.clone();
        if let Some(cap) = task.max_articles {
            config.max_articles_per_run = cap;
        }

        let crawler = BatchCrawler::with_cancel_token(&config, self.cancel.clone());
        let result = crawler
            .run(&self.flow, self.driver.as_mut(), &task.urls, download_images)
            .await;

        self.save_session().await;
        Ok(result)
    }

    /// 对比抓取 2-5 篇文章
    ///
    /// 对比只关心文本指标，图片一律不下载
    pub async fn compare(&mut self, urls: &[String]) -> Result<ComparisonReport> {
        if urls.len() < COMPARE_MIN_URLS || urls.len() > COMPARE_MAX_URLS {
            bail!(
                "对比需要 {}-{} 个 URL，实际 {} 个",
                COMPARE_MIN_URLS,
                COMPARE_MAX_URLS,
                urls.len()
            );
        }

        let crawler = BatchCrawler::with_cancel_token(&self.config, self.cancel.clone());
        let batch = crawler
            .run(&self.flow, self.driver.as_mut(), urls, false)
            .await;

        let articles: Vec<Article> = batch
            .entries
            .into_iter()
            .filter_map(|entry| match entry {
                BatchOutcome::Article(article) => Some(article),
                BatchOutcome::Error(record) => {
                    warn!("⚠️ 对比跳过失败的 URL {}: {}", record.url, record.message);
                    None
                }
            })
            .collect();

        self.save_session().await;
        ComparisonAnalyzer::new().compare(&articles)
    }

    /// 导入 JSON 数组形式的 Cookie
    ///
    /// 适用于人工在真实浏览器里完成验证后导出的 Cookie 数组，
    /// selenium 风格的 expiry 字段也能识别。导入后立即应用到
    /// 浏览器并保存为会话文件
    ///
    /// # 返回
    /// 导入的 Cookie 条数
    pub async fn load_cookies(&mut self, json: &str) -> Result<usize> {
        let cookies: Vec<Cookie> =
            serde_json::from_str(json).context("解析 Cookie JSON 失败")?;

        if cookies.is_empty() {
            bail!("Cookie 数组为空");
        }

        let count = cookies.len();
        let session = Session::new(
            self.driver.backend().as_str(),
            cookies,
            self.config.session_ttl_hours * 3600,
        );

        self.driver.set_cookies(&session).await?;
        self.session_store.save(&session).await?;

        info!("✅ 已导入 {} 条 Cookie 并保存会话", count);
        Ok(count)
    }

    /// 从文件导入 Cookie JSON
    pub async fn load_cookies_file(&mut self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取 Cookie 文件失败: {}", path.display()))?;
        self.load_cookies(&raw).await
    }

    /// 关闭浏览器资源
    pub async fn close(&mut self) -> Result<()> {
        self.driver.close().await?;
        Ok(())
    }

    /// 尝试恢复上次保存的会话，没有或失效时按无会话继续
    async fn restore_session(&mut self) -> Result<()> {
        if let Some(session) = self
            .session_store
            .load(self.driver.backend().as_str())
            .await?
        {
            info!("📂 恢复上次会话: {} 条 Cookie", session.len());
            if let Err(e) = self.driver.set_cookies(&session).await {
                warn!("⚠️ 应用会话失败，按无会话继续: {}", e);
            }
        }
        Ok(())
    }

    /// 导出并保存当前会话，失败只告警不中断抓取结果
    async fn save_session(&mut self) {
        match self.driver.get_cookies().await {
            Ok(session) if !session.is_empty() => {
                if let Err(e) = self.session_store.save(&session).await {
                    warn!("⚠️ 保存会话失败: {}", e);
                }
            }
            Ok(_) => debug!("会话为空，跳过保存"),
            Err(e) => warn!("⚠️ 导出会话失败: {}", e),
        }
    }
}
