/// 日志工具模块
///
/// 提供日志初始化和批量抓取过程中的格式化输出辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 默认级别 info，可通过 RUST_LOG 环境变量覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `backend`: 使用的浏览器后端名称
pub fn log_startup(backend: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 微信文章爬虫启动 - 后端: {}", backend);
    info!("{}", "=".repeat(60));
}

/// 记录批量任务开始信息
///
/// # 参数
/// - `total`: 文章总数
/// - `delay_secs`: 文章间隔秒数
pub fn log_batch_start(total: usize, delay_secs: u64) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量抓取: 共 {} 篇文章", total);
    info!("⏱️ 文章间隔: {} 秒起步", delay_secs);
    info!("{}", "=".repeat(60));
}

/// 记录单篇文章开始信息
///
/// # 参数
/// - `index`: 文章序号（从 1 开始）
/// - `total`: 文章总数
/// - `url`: 文章 URL
pub fn log_article_start(index: usize, total: usize, url: &str) {
    info!("\n{}", "─".repeat(60));
    info!("[文章 {}/{}] 🔍 开始抓取: {}", index, total, url);
}

/// 打印批量抓取的最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `blocked`: 被验证拦截的数量
/// - `failed`: 其他失败数量
/// - `total`: 总数
pub fn print_batch_stats(success: usize, blocked: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("🛑 验证拦截: {}", blocked);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}
