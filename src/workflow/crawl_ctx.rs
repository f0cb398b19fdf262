//! 抓取上下文
//!
//! 封装"我正在抓取这次运行中的第几篇文章"这一信息

use std::fmt::Display;

/// 抓取上下文
///
/// 包含抓取单篇文章所需的全部上下文信息
#[derive(Debug, Clone)]
pub struct CrawlCtx {
    /// 文章 URL
    pub url: String,

    /// 文章在本次运行中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本次运行的文章总数
    pub total: usize,

    /// 是否下载图片
    pub download_images: bool,

    /// 图片输出目录覆盖（None 时按 URL 哈希生成）
    pub custom_dir: Option<String>,
}

impl CrawlCtx {
    /// 创建新的抓取上下文
    pub fn new(url: impl Into<String>, index: usize, total: usize, download_images: bool) -> Self {
        Self {
            url: url.into(),
            index,
            total,
            download_images,
            custom_dir: None,
        }
    }

    /// 单篇抓取的上下文
    pub fn single(url: impl Into<String>, download_images: bool) -> Self {
        Self::new(url, 1, 1, download_images)
    }

    /// 指定图片输出目录
    pub fn with_custom_dir(mut self, dir: impl Into<String>) -> Self {
        self.custom_dir = Some(dir.into());
        self
    }
}

impl Display for CrawlCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文章 {}/{}]", self.index, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shows_run_position() {
        let ctx = CrawlCtx::new("https://mp.weixin.qq.com/s/abc", 2, 5, true);
        assert_eq!(ctx.to_string(), "[文章 2/5]");
    }

    #[test]
    fn test_single_defaults() {
        let ctx = CrawlCtx::single("https://mp.weixin.qq.com/s/abc", false);
        assert_eq!(ctx.index, 1);
        assert_eq!(ctx.total, 1);
        assert!(!ctx.download_images);
        assert!(ctx.custom_dir.is_none());
    }
}
