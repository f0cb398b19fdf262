//! 批量抓取器 - 编排层
//!
//! ## 职责
//!
//! 1. **顺序抓取**：复用同一个浏览器驱动逐篇抓取，不并发
//! 2. **节流**：文章之间等待固定间隔加随机抖动，降低触发验证的概率
//! 3. **熔断**：一旦触发验证页立即停止，继续抓只会加深风控
//! 4. **上限**：单次运行最多抓取 max_articles_per_run 篇
//! 5. **可取消**：通过 CancellationToken 随时停止，等待中也能响应
//! 6. **统计**：产出与输入等长的逐 URL 结果列表与汇总计数
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单篇文章的细节，向下委托 CrawlFlow
//! - **记录完整**：没有尝试的 URL 也会留下说明原因的记录

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::browser::BrowserDriver;
use crate::config::Config;
use crate::models::{BatchOutcome, BatchResult, ErrorRecord};
use crate::utils::logging;
use crate::workflow::{CrawlCtx, CrawlFlow};

/// 批量抓取器
pub struct BatchCrawler {
    delay_secs: u64,
    jitter_secs: u64,
    max_articles: usize,
    cancel: CancellationToken,
}

impl BatchCrawler {
    /// 创建新的批量抓取器
    pub fn new(config: &Config) -> Self {
        Self {
            delay_secs: config.batch_delay_secs,
            jitter_secs: config.batch_jitter_secs,
            max_articles: config.max_articles_per_run.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部取消令牌创建，多个批次共享同一个停止开关
    pub fn with_cancel_token(config: &Config, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::new(config)
        }
    }

    /// 取消令牌，调用方持有后可随时停止批量任务
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 批量抓取一组 URL
    ///
    /// # 参数
    /// * `flow` - 单篇抓取流程
    /// * `driver` - 浏览器驱动，整个批次复用
    /// * `urls` - 待抓取的 URL 列表
    /// * `download_images` - 是否下载图片
    ///
    /// # 返回
    /// 与输入等长的结果列表，每个 URL 都有成功文章或失败记录
    pub async fn run(
        &self,
        flow: &CrawlFlow,
        driver: &mut dyn BrowserDriver,
        urls: &[String],
        download_images: bool,
    ) -> BatchResult {
        let total = urls.len();
        if total == 0 {
            warn!("⚠️ 没有待抓取的 URL");
            return BatchResult::from_entries(Vec::new());
        }

        let attempt_total = total.min(self.max_articles);
        if attempt_total < total {
            warn!(
                "⚠️ 文章数超过单次上限 {}，后 {} 篇不会尝试",
                self.max_articles,
                total - attempt_total
            );
        }

        logging::log_batch_start(attempt_total, self.delay_secs);

        let mut entries: Vec<BatchOutcome> = Vec::with_capacity(total);
        // 提前停止后剩余 URL 统一记录这个原因
        let mut stopped: Option<String> = None;

        for (i, url) in urls.iter().enumerate() {
            if let Some(reason) = &stopped {
                entries.push(BatchOutcome::Error(ErrorRecord::error(url, reason.clone())));
                continue;
            }

            if self.cancel.is_cancelled() {
                let reason = "批量任务被取消，未尝试".to_string();
                entries.push(BatchOutcome::Error(ErrorRecord::error(url, reason.clone())));
                stopped = Some(reason);
                continue;
            }

            if i >= attempt_total {
                entries.push(BatchOutcome::Error(ErrorRecord::error(
                    url,
                    format!("超出单次运行上限 {} 篇，未尝试", self.max_articles),
                )));
                continue;
            }

            // 文章之间节流等待，第一篇不等
            if i > 0 && !self.pause_between_articles().await {
                let reason = "批量任务被取消，未尝试".to_string();
                entries.push(BatchOutcome::Error(ErrorRecord::error(url, reason.clone())));
                stopped = Some(reason);
                continue;
            }

            logging::log_article_start(i + 1, attempt_total, url);
            let ctx = CrawlCtx::new(url.clone(), i + 1, attempt_total, download_images);

            match flow.run(driver, &ctx).await {
                Ok(article) => entries.push(BatchOutcome::Article(article)),
                Err(e) if e.is_verification() => {
                    error!(
                        "[文章 {}/{}] ❌ 触发验证页，批量提前停止: {}",
                        i + 1,
                        attempt_total,
                        e
                    );
                    entries.push(BatchOutcome::Error(ErrorRecord::blocked(url, e.to_string())));
                    stopped = Some("前序文章触发验证页，批量提前停止，未尝试".to_string());
                }
                Err(e) => {
                    error!("[文章 {}/{}] ❌ 抓取失败: {}", i + 1, attempt_total, e);
                    entries.push(BatchOutcome::Error(ErrorRecord::error(url, e.to_string())));
                }
            }
        }

        let result = BatchResult::from_entries(entries);
        logging::print_batch_stats(
            result.success_count,
            result.blocked_count,
            result.error_count,
            result.len(),
        );
        result
    }

    /// 文章之间的节流等待，返回 false 表示任务被取消
    async fn pause_between_articles(&self) -> bool {
        let jitter = if self.jitter_secs > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_secs)
        } else {
            0
        };
        let wait = Duration::from_secs(self.delay_secs + jitter);
        debug!("⏱️ 等待 {} 秒后抓取下一篇", wait.as_secs());

        tokio::select! {
            _ = sleep(wait) => true,
            _ = self.cancel.cancelled() => {
                warn!("🛑 收到取消信号，停止批量抓取");
                false
            }
        }
    }
}
