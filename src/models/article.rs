use serde::{Deserialize, Serialize};

use crate::utils::text::truncate_text;

/// 文章抓取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// 抓取并提取成功
    Success,
    /// 被反爬验证页拦截
    Blocked,
    /// 其他失败
    Error,
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArticleStatus::Success => write!(f, "success"),
            ArticleStatus::Blocked => write!(f, "blocked"),
            ArticleStatus::Error => write!(f, "error"),
        }
    }
}

/// 单张图片的下载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// 已下载到本地
    Downloaded,
    /// 下载失败（不影响文章本身）
    Failed,
    /// 未下载（图片下载被关闭时仍记录 URL）
    Skipped,
}

/// 文章内嵌图片
///
/// index 为文档顺序中的位置，从 0 开始，重试之间保持稳定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub index: usize,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub status: ImageStatus,
}

impl Image {
    /// 创建未下载状态的图片记录
    pub fn skipped(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            local_path: None,
            status: ImageStatus::Skipped,
        }
    }
}

/// 抓取到的文章
///
/// 每次抓取生成一份，返回后不再修改；word_count 始终由
/// content_text 重新计算得出，不信任上游数值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub author: String,
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    pub content_text: String,
    pub content_html: String,
    pub word_count: usize,
    pub images: Vec<Image>,
    pub crawl_timestamp: String,
    pub status: ArticleStatus,
}

impl Article {
    /// 生成文章摘要视图
    pub fn to_summary(&self) -> ArticleSummary {
        ArticleSummary {
            url: self.url.clone(),
            title: self.title.clone(),
            account_name: self.account_name.clone(),
            author: self.author.clone(),
            publish_date: self.publish_date.clone(),
            word_count: self.word_count,
            image_count: self.images.len(),
            preview: truncate_text(&self.content_text, 300),
        }
    }
}

/// 文章摘要视图（标题、账号与正文前 300 字）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    pub account_name: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    pub word_count: usize,
    pub image_count: usize,
    pub preview: String,
}
