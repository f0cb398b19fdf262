//! 文章抓取流程 - 流程层
//!
//! 核心职责：定义"一篇文章"的完整抓取流程
//!
//! 流程顺序：
//! 1. 校验 URL → 导航 → 等待加载
//! 2. DOM 快照 → 验证页检测
//! 3. 内容提取 → 图片下载 → 组装 Article

use tracing::{debug, info, warn};
use url::Url;

use crate::browser::BrowserDriver;
use crate::config::Config;
use crate::error::{ExtractionError, SpiderError, SpiderResult};
use crate::models::{Article, ArticleStatus, Image};
use crate::services::{ContentExtractor, ImageDownloader, PageVerdict, VerificationDetector};
use crate::workflow::crawl_ctx::CrawlCtx;

/// 允许抓取的文章域名
const ALLOWED_HOSTS: [&str; 2] = ["mp.weixin.qq.com", "weixin.qq.com"];

/// 校验 URL 是否为微信文章链接
///
/// # 返回
/// * `Ok(())` - http/https 且域名属于微信文章域
/// * `Err(SpiderError)` - 解析失败、协议或域名不符
pub fn validate_article_url(url: &str) -> SpiderResult<()> {
    let parsed = Url::parse(url).map_err(|e| SpiderError::invalid_url(url, e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SpiderError::invalid_url(
                url,
                format!("不支持的协议: {}", other),
            ));
        }
    }

    let host = parsed.host_str().unwrap_or("");
    if !ALLOWED_HOSTS.contains(&host) {
        return Err(SpiderError::invalid_url(
            url,
            format!("不是微信文章域名: '{}'", host),
        ));
    }
    Ok(())
}

/// 文章抓取流程
///
/// 职责：
/// - 编排单篇文章的完整抓取流程
/// - 决定何时检测、何时提取、何时下载图片
/// - 不持有浏览器资源（驱动由调用方传入）
/// - 只依赖业务能力（services）
pub struct CrawlFlow {
    detector: VerificationDetector,
    extractor: ContentExtractor,
    downloader: ImageDownloader,
    page_load_timeout_secs: u64,
}

impl CrawlFlow {
    /// 创建新的抓取流程
    pub fn new(config: &Config) -> SpiderResult<Self> {
        Ok(Self {
            detector: VerificationDetector::new(),
            extractor: ContentExtractor::new(),
            downloader: ImageDownloader::new(config)?,
            page_load_timeout_secs: config.page_load_timeout_secs,
        })
    }

    /// 抓取单篇文章
    ///
    /// # 参数
    /// * `driver` - 浏览器驱动（由调用方持有并复用）
    /// * `ctx` - 抓取上下文
    ///
    /// # 返回
    /// * `Ok(Article)` - 抓取成功
    /// * `Err(SpiderError)` - 被验证页拦截、加载超时或提取失败
    pub async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        ctx: &CrawlCtx,
    ) -> SpiderResult<Article> {
        validate_article_url(&ctx.url)?;

        // ========== 流程 1: 导航并等待加载 ==========
        info!("{} 🔍 导航到文章页: {}", ctx, ctx.url);
        driver.navigate(&ctx.url).await?;
        driver.wait_for_load(self.page_load_timeout_secs).await?;

        // ========== 流程 2: 快照 + 验证页检测 ==========
        let html = driver.dom_snapshot().await?;

        match self.detector.classify(&html) {
            PageVerdict::Blocked { marker } => {
                warn!("{} ❌ 触发反爬验证: 检测到 '{}'", ctx, marker);
                return Err(SpiderError::verification_required(&ctx.url, marker));
            }
            PageVerdict::Errored => {
                warn!("{} ⚠️ 页面结构无法识别", ctx);
                return Err(SpiderError::Extraction(
                    ExtractionError::StructureUnrecognized {
                        url: ctx.url.clone(),
                    },
                ));
            }
            PageVerdict::Clean => {
                debug!("{} 页面正常", ctx);
            }
        }

        // ========== 流程 3: 内容提取 ==========
        let extracted = self.extractor.extract(&ctx.url, &html)?;
        info!(
            "{} ✓ 提取完成: {} ({} 词, {} 张图)",
            ctx,
            extracted.title,
            extracted.word_count,
            extracted.images.len()
        );

        // ========== 流程 4: 图片下载 ==========
        let images: Vec<Image> = if ctx.download_images && !extracted.images.is_empty() {
            info!("{} 📦 下载 {} 张图片...", ctx, extracted.images.len());
            self.downloader
                .download_all(&ctx.url, ctx.custom_dir.as_deref(), &extracted.images)
                .await
        } else {
            // 关闭下载时仍保留图片 URL 记录
            extracted
                .images
                .iter()
                .map(|r| Image::skipped(r.index, r.url.clone()))
                .collect()
        };

        let article = Article {
            url: ctx.url.clone(),
            title: extracted.title,
            author: extracted.author,
            account_name: extracted.account_name,
            publish_date: extracted.publish_date,
            content_text: extracted.content_text,
            content_html: extracted.content_html,
            word_count: extracted.word_count,
            images,
            crawl_timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            status: ArticleStatus::Success,
        };

        info!("{} ✅ 抓取完成: {}", ctx, article.title);
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedDriver;

    const ARTICLE_HTML: &str = r#"
        <html><body>
            <h1 class="rich_media_title">流程测试标题</h1>
            <div id="js_content">
                <p>正文第一段</p>
                <p><img data-src="https://mmbiz.qpic.cn/pic/a.jpg"></p>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_validate_url_accepts_weixin_hosts() {
        assert!(validate_article_url("https://mp.weixin.qq.com/s/abc123").is_ok());
        assert!(validate_article_url("http://weixin.qq.com/r/xyz").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_hosts() {
        assert!(validate_article_url("https://example.com/s/abc").is_err());
        // 前缀伪装的域名也要拒绝
        assert!(validate_article_url("https://mp.weixin.qq.com.evil.com/s/abc").is_err());
    }

    #[test]
    fn test_validate_url_rejects_bad_scheme_and_garbage() {
        assert!(validate_article_url("ftp://mp.weixin.qq.com/s/abc").is_err());
        assert!(validate_article_url("不是链接").is_err());
    }

    #[tokio::test]
    async fn test_run_extracts_clean_article() {
        let flow = CrawlFlow::new(&Config::default()).unwrap();
        let mut driver = ScriptedDriver::new(&[ARTICLE_HTML]);
        let ctx = CrawlCtx::single("https://mp.weixin.qq.com/s/abc", false);

        let article = flow.run(&mut driver, &ctx).await.unwrap();
        assert_eq!(article.title, "流程测试标题");
        assert_eq!(article.status, ArticleStatus::Success);
        assert_eq!(article.word_count, 5);
    }

    #[tokio::test]
    async fn test_run_keeps_image_urls_when_download_disabled() {
        let flow = CrawlFlow::new(&Config::default()).unwrap();
        let mut driver = ScriptedDriver::new(&[ARTICLE_HTML]);
        let ctx = CrawlCtx::single("https://mp.weixin.qq.com/s/abc", false);

        let article = flow.run(&mut driver, &ctx).await.unwrap();
        assert_eq!(article.images.len(), 1);
        assert_eq!(article.images[0].url, "https://mmbiz.qpic.cn/pic/a.jpg");
        assert!(article.images[0].local_path.is_none());
    }

    #[tokio::test]
    async fn test_run_reports_verification_page() {
        let flow = CrawlFlow::new(&Config::default()).unwrap();
        let mut driver = ScriptedDriver::new(&[
            "<html><body><p>环境异常，需要完成验证</p></body></html>",
        ]);
        let ctx = CrawlCtx::single("https://mp.weixin.qq.com/s/abc", true);

        let err = flow.run(&mut driver, &ctx).await.unwrap_err();
        assert!(err.is_verification());
    }

    #[tokio::test]
    async fn test_run_reports_unrecognized_page() {
        let flow = CrawlFlow::new(&Config::default()).unwrap();
        let mut driver = ScriptedDriver::new(&[
            "<html><body><p>既不是文章也不是验证页</p></body></html>",
        ]);
        let ctx = CrawlCtx::single("https://mp.weixin.qq.com/s/abc", true);

        let err = flow.run(&mut driver, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SpiderError::Extraction(ExtractionError::StructureUnrecognized { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_url_before_navigation() {
        let flow = CrawlFlow::new(&Config::default()).unwrap();
        let mut driver = ScriptedDriver::new(&[]);
        let ctx = CrawlCtx::single("https://example.com/s/abc", true);

        let err = flow.run(&mut driver, &ctx).await.unwrap_err();
        assert!(matches!(err, SpiderError::InvalidUrl { .. }));
    }
}
