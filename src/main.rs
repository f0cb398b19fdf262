use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::warn;

use weixin_spider::utils::logging;
use weixin_spider::{Config, WeixinSpider};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    // 加载配置
    let config = Config::from_env();

    run(config, &args).await
}

async fn run(config: Config, args: &[String]) -> Result<()> {
    let mut spider = WeixinSpider::initialize(config).await?;

    // Ctrl-C 取消批量任务，正在等待间隔时也能响应
    let cancel = spider.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = dispatch(&mut spider, args).await;

    // 无论成功失败都释放浏览器
    if let Err(e) = spider.close().await {
        warn!("⚠️ 关闭浏览器失败: {}", e);
    }

    result
}

/// 按第一个参数分发到对应模式
async fn dispatch(spider: &mut WeixinSpider, args: &[String]) -> Result<()> {
    match args[0].as_str() {
        "--full" => {
            let url = expect_arg(args, 1, "--full 需要文章 URL")?;
            let article = spider.crawl(url).await?;
            print_json(&article)
        }
        "--analyze" => {
            let url = expect_arg(args, 1, "--analyze 需要文章 URL")?;
            let analysis = spider.analyze(url).await?;
            print_json(&analysis)
        }
        "--compare" => {
            let urls = args[1..].to_vec();
            let report = spider.compare(&urls).await?;
            print_json(&report)
        }
        "--batch" => {
            let path = expect_arg(args, 1, "--batch 需要 TOML 任务文件路径")?;
            let result = spider.batch_crawl_from_task(Path::new(path)).await?;
            print_json(&result)
        }
        "--load-cookies" => {
            let path = expect_arg(args, 1, "--load-cookies 需要 Cookie JSON 文件路径")?;
            let count = spider.load_cookies_file(Path::new(path)).await?;
            println!("已导入 {} 条 Cookie", count);
            Ok(())
        }
        flag if flag.starts_with("--") => {
            print_usage();
            bail!("未知参数: {}", flag)
        }
        url => {
            // 默认模式：抓取并输出摘要
            let summary = spider.summarize(url).await?;
            print_json(&summary)
        }
    }
}

fn expect_arg<'a>(args: &'a [String], index: usize, message: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value.as_str()),
        None => bail!("{}", message),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    println!("用法: weixin_spider [模式] <参数>");
    println!();
    println!("模式:");
    println!("  <url>                     抓取并输出文章摘要");
    println!("  --full <url>              抓取完整文章（按配置下载图片）");
    println!("  --analyze <url>           抓取并输出文本分析");
    println!("  --compare <url1> <url2>…  对比 2-5 篇文章（不下载图片）");
    println!("  --batch <tasks.toml>      按任务文件批量抓取");
    println!("  --load-cookies <file>     导入人工验证后导出的 Cookie JSON");
    println!();
    println!("示例:");
    println!("  weixin_spider https://mp.weixin.qq.com/s/xxx");
    println!("  weixin_spider --full https://mp.weixin.qq.com/s/xxx");
    println!("  weixin_spider --compare https://mp.weixin.qq.com/s/a https://mp.weixin.qq.com/s/b");
    println!("  weixin_spider --batch tasks.toml");
    println!();
    println!("常用环境变量: BROWSER_BACKEND (chromium|agent), DOWNLOAD_IMAGES,");
    println!("  OUTPUT_DIR, SESSION_FILE, BROWSER_DEBUG_PORT, BATCH_DELAY, RUST_LOG");
}
