use serde::{Deserialize, Serialize};

use crate::models::article::Article;

/// 单篇文章的统计分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub word_count: usize,
    pub char_count: usize,
    pub image_count: usize,
    pub paragraph_count: usize,
    /// 以 200 字/分钟估算的阅读时间
    pub estimated_read_time_minutes: f64,
    /// 从 strong 标签提取的关键短语，最多 10 条
    pub key_phrases: Vec<String>,
}

/// 文章内容与其分析结果的组合视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedArticle {
    pub article: Article,
    pub analysis: ArticleAnalysis,
}

/// 对比报告中的单篇条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub url: String,
    pub title: String,
    pub word_count: usize,
    pub image_count: usize,
    /// 按词频排序的高频词
    pub top_terms: Vec<String>,
}

/// 两篇文章高频词集合的重叠度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermOverlap {
    pub url_a: String,
    pub url_b: String,
    /// Jaccard 系数，0 表示完全不重叠，1 表示完全一致
    pub jaccard: f64,
}

/// 多篇文章的对比报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub articles: Vec<ComparisonItem>,
    pub overlaps: Vec<TermOverlap>,
    /// 按词数从多到少排序的 URL
    pub ranked_by_word_count: Vec<String>,
    /// 按图片数从多到少排序的 URL
    pub ranked_by_image_count: Vec<String>,
    pub average_word_count: f64,
}
