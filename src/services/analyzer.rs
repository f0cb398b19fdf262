//! 文章分析服务 - 业务能力层
//!
//! 只负责对已抓取的文章做统计分析和多篇对比，纯计算无副作用

use anyhow::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::analysis::{ArticleAnalysis, ComparisonItem, ComparisonReport, TermOverlap};
use crate::models::article::{Article, ArticleStatus};
use crate::utils::text::is_cjk;

/// 估算阅读时间用的速度，单位：字/分钟
const READING_SPEED_CPM: f64 = 200.0;

/// 关键短语的最大长度
const MAX_KEY_PHRASE_LENGTH: usize = 100;

/// 关键短语最多保留条数
const MAX_KEY_PHRASES: usize = 10;

/// 高频词统计时忽略的停用词
static STOPWORDS: phf::Set<&'static str> = phf::phf_set! {
    // 英文常见虚词
    "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "for",
    "with", "is", "are", "was", "were", "be", "been", "it", "this", "that",
    "these", "those", "as", "at", "by", "from", "we", "you", "they", "he",
    "she", "not", "no", "do", "does", "did", "have", "has", "had", "will",
    "would", "can", "could", "should", "about", "into", "than", "then",
    "there", "what", "when", "which", "who", "how", "all", "also", "more",
    // 中文常见助词和代词
    "的", "了", "和", "是", "在", "我", "有", "就", "不", "人", "都", "一",
    "上", "也", "很", "到", "说", "要", "去", "你", "会", "着", "看", "好",
    "这", "那", "与", "及", "或", "等", "被", "把", "让", "向", "但", "而",
    "并", "对", "从", "为", "以", "之", "其", "中", "个", "们",
};

/// 单篇文章分析服务
///
/// 职责：
/// - 从文章正文和 HTML 计算统计指标
/// - 不抓取、不访问网络
pub struct ArticleAnalyzer;

impl ArticleAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// 分析单篇文章
    ///
    /// # 返回
    /// 返回字数、段落数、预计阅读时间和关键短语等统计
    pub fn analyze(&self, article: &Article) -> Result<ArticleAnalysis> {
        let paragraph_re = Regex::new(r"(?s)<p[^>]*>.*?</p>")?;
        let paragraph_count = paragraph_re.find_iter(&article.content_html).count();

        let strong_re = Regex::new(r"(?s)<strong[^>]*>(.*?)</strong>")?;
        let tag_re = Regex::new(r"<[^>]+>")?;
        let mut key_phrases = Vec::new();
        for cap in strong_re.captures_iter(&article.content_html) {
            if let Some(m) = cap.get(1) {
                let clean = tag_re.replace_all(m.as_str(), "").trim().to_string();
                if !clean.is_empty() && clean.chars().count() < MAX_KEY_PHRASE_LENGTH {
                    key_phrases.push(clean);
                }
            }
        }
        key_phrases.truncate(MAX_KEY_PHRASES);

        // 阅读时间按 200 字/分钟估算，保留一位小数
        let estimated_read_time_minutes =
            (article.word_count as f64 / READING_SPEED_CPM * 10.0).round() / 10.0;

        Ok(ArticleAnalysis {
            word_count: article.word_count,
            char_count: article.content_text.chars().count(),
            image_count: article.images.len(),
            paragraph_count,
            estimated_read_time_minutes,
            key_phrases,
        })
    }
}

impl Default for ArticleAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// 多篇文章对比服务
///
/// 职责：
/// - 只接受抓取成功的文章，不足 2 篇报错
/// - 高频词、重叠度和排名全部由正文确定性推导
pub struct ComparisonAnalyzer {
    top_n: usize,
}

impl ComparisonAnalyzer {
    pub fn new() -> Self {
        Self { top_n: 20 }
    }

    pub fn with_top_n(top_n: usize) -> Self {
        Self { top_n }
    }

    /// 对比多篇文章
    ///
    /// # 参数
    /// - `articles`: 已完成的文章，非成功状态的会被剔除并告警
    ///
    /// # 返回
    /// 返回对比报告，可供分析的文章不足 2 篇时报错
    pub fn compare(&self, articles: &[Article]) -> Result<ComparisonReport> {
        let mut analyzable = Vec::new();
        for article in articles {
            if article.status == ArticleStatus::Success {
                analyzable.push(article);
            } else {
                warn!("⚠️ 文章 {} 状态为 {}，不参与对比", article.url, article.status);
            }
        }

        if analyzable.len() < 2 {
            anyhow::bail!(
                "对比至少需要 2 篇成功抓取的文章，当前只有 {} 篇",
                analyzable.len()
            );
        }

        let items: Vec<ComparisonItem> = analyzable
            .iter()
            .map(|article| ComparisonItem {
                url: article.url.clone(),
                title: article.title.clone(),
                word_count: article.word_count,
                image_count: article.images.len(),
                top_terms: top_terms(&article.content_text, self.top_n),
            })
            .collect();

        let mut overlaps = Vec::new();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                let set_a: HashSet<&str> = items[i].top_terms.iter().map(|s| s.as_str()).collect();
                let set_b: HashSet<&str> = items[j].top_terms.iter().map(|s| s.as_str()).collect();
                overlaps.push(TermOverlap {
                    url_a: items[i].url.clone(),
                    url_b: items[j].url.clone(),
                    jaccard: jaccard(&set_a, &set_b),
                });
            }
        }

        let mut by_words: Vec<&ComparisonItem> = items.iter().collect();
        by_words.sort_by(|a, b| b.word_count.cmp(&a.word_count));
        let mut by_images: Vec<&ComparisonItem> = items.iter().collect();
        by_images.sort_by(|a, b| b.image_count.cmp(&a.image_count));

        let average_word_count =
            items.iter().map(|i| i.word_count).sum::<usize>() as f64 / items.len() as f64;

        Ok(ComparisonReport {
            ranked_by_word_count: by_words.iter().map(|i| i.url.clone()).collect(),
            ranked_by_image_count: by_images.iter().map(|i| i.url.clone()).collect(),
            articles: items,
            overlaps,
            average_word_count,
        })
    }
}

impl Default for ComparisonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// 切分正文为词项：拉丁词转小写，CJK 连续段切成相邻二字组
fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut latin = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_latin = |latin: &mut String, terms: &mut Vec<String>| {
        if !latin.is_empty() {
            terms.push(std::mem::take(latin));
        }
    };
    let flush_cjk = |cjk_run: &mut Vec<char>, terms: &mut Vec<String>| {
        match cjk_run.len() {
            0 => {}
            1 => terms.push(cjk_run[0].to_string()),
            _ => {
                for pair in cjk_run.windows(2) {
                    terms.push(pair.iter().collect());
                }
            }
        }
        cjk_run.clear();
    };

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut terms);
            latin.push(c.to_ascii_lowercase());
        } else if is_cjk(c) {
            flush_latin(&mut latin, &mut terms);
            cjk_run.push(c);
        } else {
            flush_latin(&mut latin, &mut terms);
            flush_cjk(&mut cjk_run, &mut terms);
        }
    }
    flush_latin(&mut latin, &mut terms);
    flush_cjk(&mut cjk_run, &mut terms);

    terms
        .into_iter()
        .filter(|t| !STOPWORDS.contains(t.as_str()))
        .collect()
}

/// 按词频取前 n 个词项，频次相同时按字典序保证结果稳定
fn top_terms(text: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for term in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(term, _)| term).collect()
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::Image;

    fn article(url: &str, text: &str, html: &str, image_count: usize) -> Article {
        Article {
            url: url.to_string(),
            title: format!("标题 {}", url),
            author: "作者".to_string(),
            account_name: "公众号".to_string(),
            publish_date: None,
            content_text: text.to_string(),
            content_html: html.to_string(),
            word_count: crate::utils::text::word_count(text),
            images: (0..image_count)
                .map(|i| Image::skipped(i, format!("https://img/{}", i)))
                .collect(),
            crawl_timestamp: "2024-01-01 00:00:00".to_string(),
            status: ArticleStatus::Success,
        }
    }

    #[test]
    fn test_analyze_counts_paragraphs_and_phrases() {
        let html = r#"<p>第一段</p><p class="x">第二段<strong>核心<span>观点</span></strong></p><p>第三段</p>"#;
        let a = article("https://a", "第一段\n第二段核心观点\n第三段", html, 2);
        let analysis = ArticleAnalyzer::new().analyze(&a).unwrap();

        assert_eq!(analysis.paragraph_count, 3);
        assert_eq!(analysis.image_count, 2);
        assert_eq!(analysis.key_phrases, vec!["核心观点".to_string()]);
        assert_eq!(analysis.char_count, a.content_text.chars().count());
    }

    #[test]
    fn test_analyze_read_time() {
        let text = "字".repeat(400);
        let a = article("https://a", &text, "", 0);
        let analysis = ArticleAnalyzer::new().analyze(&a).unwrap();
        assert_eq!(analysis.word_count, 400);
        assert!((analysis.estimated_read_time_minutes - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_analyze_caps_key_phrases() {
        let html = (0..15)
            .map(|i| format!("<strong>要点{}</strong>", i))
            .collect::<String>();
        let a = article("https://a", "正文", &html, 0);
        let analysis = ArticleAnalyzer::new().analyze(&a).unwrap();
        assert_eq!(analysis.key_phrases.len(), 10);
    }

    #[test]
    fn test_analyze_skips_overlong_phrases() {
        let html = format!("<strong>{}</strong><strong>短语</strong>", "长".repeat(120));
        let a = article("https://a", "正文", &html, 0);
        let analysis = ArticleAnalyzer::new().analyze(&a).unwrap();
        assert_eq!(analysis.key_phrases, vec!["短语".to_string()]);
    }

    #[test]
    fn test_tokenize_mixed_text() {
        let terms = tokenize("Rust 内存安全");
        assert!(terms.contains(&"rust".to_string()));
        assert!(terms.contains(&"内存".to_string()));
        assert!(terms.contains(&"存安".to_string()));
        assert!(terms.contains(&"安全".to_string()));
    }

    #[test]
    fn test_tokenize_filters_stopwords() {
        let terms = tokenize("the rust book 的 内容");
        assert!(!terms.contains(&"the".to_string()));
        assert!(!terms.contains(&"的".to_string()));
        assert!(terms.contains(&"rust".to_string()));
    }

    #[test]
    fn test_top_terms_ordering_is_stable() {
        let text = "alpha alpha beta beta gamma";
        assert_eq!(top_terms(text, 3), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<&str> = ["x", "y"].into_iter().collect();
        let b: HashSet<&str> = ["x", "y"].into_iter().collect();
        let c: HashSet<&str> = ["z"].into_iter().collect();
        let empty: HashSet<&str> = HashSet::new();
        assert!((jaccard(&a, &b) - 1.0).abs() < f64::EPSILON);
        assert!((jaccard(&a, &c) - 0.0).abs() < f64::EPSILON);
        assert!((jaccard(&empty, &empty) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare_rankings_and_average() {
        let long = article("https://long", &"字".repeat(300), "", 1);
        let short = article("https://short", &"字".repeat(100), "", 4);
        let report = ComparisonAnalyzer::new().compare(&[short, long]).unwrap();

        assert_eq!(report.ranked_by_word_count[0], "https://long");
        assert_eq!(report.ranked_by_image_count[0], "https://short");
        assert!((report.average_word_count - 200.0).abs() < f64::EPSILON);
        assert_eq!(report.overlaps.len(), 1);
    }

    #[test]
    fn test_compare_excludes_non_success() {
        let mut blocked = article("https://blocked", "正文", "", 0);
        blocked.status = ArticleStatus::Blocked;
        let ok_a = article("https://a", "一些正文内容", "", 0);
        let ok_b = article("https://b", "另一些正文内容", "", 0);

        let report = ComparisonAnalyzer::new()
            .compare(&[ok_a, blocked.clone(), ok_b])
            .unwrap();
        assert_eq!(report.articles.len(), 2);

        let result = ComparisonAnalyzer::new().compare(&[blocked, article("https://c", "正文", "", 0)]);
        assert!(result.is_err());
    }
}
