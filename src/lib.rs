//! # Weixin Spider
//!
//! 一个能在反爬验证环境下存活的微信公众号文章爬虫
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Browser）
//! - `browser/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `BrowserDriver` - 统一的页面自动化契约，chromium / agent 双后端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇文章
//! - `VerificationDetector` - 验证页判定能力
//! - `ContentExtractor` - 结构化提取能力
//! - `ImageDownloader` - 有界并发的图片下载能力
//! - `SessionStore` - Cookie 会话持久化能力
//! - `ArticleAnalyzer` / `ComparisonAnalyzer` - 文本分析能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇文章"的完整抓取流程
//! - `CrawlCtx` - 上下文封装（url + 批次位置）
//! - `CrawlFlow` - 流程编排（导航 → 检测 → 提取 → 下图）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_crawler` - 批量抓取器，节流、熔断与统计
//! - `spider` - 门面，组装驱动、会话存储与流程
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod spider;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{build_driver, Backend, BrowserDriver};
pub use config::Config;
pub use error::{SpiderError, SpiderResult};
pub use models::{Article, ArticleStatus, BatchResult, Session};
pub use orchestrator::BatchCrawler;
pub use spider::WeixinSpider;
pub use workflow::{CrawlCtx, CrawlFlow};
