//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量抓取的调度，是抓取任务的"指挥中心"。
//!
//! ### `batch_crawler` - 批量抓取器
//! - 顺序调度多篇文章的抓取
//! - 文章间节流（固定间隔 + 随机抖动）
//! - 验证拦截熔断与单次运行上限
//! - 可取消，并输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_crawler (处理 Vec<Url>)
//!     ↓
//! workflow::CrawlFlow (处理单篇文章)
//!     ↓
//! services (能力层：detector / extractor / downloader / session)
//!     ↓
//! browser (基础设施：BrowserDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：只做调度、节流和统计，不做具体抓取
//! 2. **顺序执行**：同一个浏览器驱动不并发复用
//! 3. **向下依赖**：编排层 → workflow → services → browser

pub mod batch_crawler;

pub use batch_crawler::BatchCrawler;
