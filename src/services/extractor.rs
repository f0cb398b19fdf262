//! 内容提取服务 - 业务能力层
//!
//! 只负责把 Clean 页面快照确定性地转换为结构化内容，
//! 不触碰浏览器，不做网络请求

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{ExtractionError, SpiderError, SpiderResult};
use crate::utils::text;

/// 标题选择器，按优先级排列
const TITLE_SELECTORS: [&str; 3] = ["h1.rich_media_title", "#activity-name", "h1"];

/// 作者选择器
const AUTHOR_SELECTORS: [&str; 3] = [
    "span.rich_media_meta.rich_media_meta_text",
    "#js_name",
    ".profile_nickname",
];

/// 公众号名称选择器
const ACCOUNT_SELECTORS: [&str; 3] = ["#js_name", ".profile_nickname", "a.weui-wa-hotarea"];

/// 发布时间选择器
const DATE_SELECTORS: [&str; 3] = [
    "#publish_time",
    "em.rich_media_meta.rich_media_meta_text",
    ".rich_media_meta_list em",
];

/// 正文容器选择器
const CONTENT_SELECTOR: &str = "#js_content";

/// 渲染纯文本时产生换行的块级标签
const BLOCK_ELEMENTS: [&str; 17] = [
    "p", "div", "section", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "figure", "figcaption", "tr",
];

/// 正文中发现的图片引用
///
/// index 是 img 元素在文档中的位置，被跳过的 data: 图片会留下空位，
/// 保证同一篇文章多次提取得到相同的编号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub index: usize,
    pub url: String,
}

/// 从快照中提取出的结构化内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub author: String,
    pub account_name: String,
    pub publish_date: Option<String>,
    pub content_text: String,
    pub content_html: String,
    pub word_count: usize,
    pub images: Vec<ImageRef>,
}

/// 内容提取服务
///
/// 职责：
/// - 对同一份快照的提取结果逐字节一致
/// - 各字段独立降级，单个字段缺失不影响其它字段
/// - 正文容器缺失时报错而不是返回空文章
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从页面快照提取文章内容
    ///
    /// # 参数
    /// - `url`: 文章 URL，仅用于错误信息
    /// - `html`: 页面 DOM 快照
    ///
    /// # 返回
    /// 返回结构化内容，正文容器缺失时返回提取错误
    pub fn extract(&self, url: &str, html: &str) -> SpiderResult<ExtractedContent> {
        let document = Html::parse_document(html);

        let content_selector = Selector::parse(CONTENT_SELECTOR).map_err(|_| {
            SpiderError::Extraction(ExtractionError::InvalidSelector {
                selector: CONTENT_SELECTOR.to_string(),
            })
        })?;
        let content_el = document.select(&content_selector).next().ok_or_else(|| {
            SpiderError::Extraction(ExtractionError::ContentMissing {
                url: url.to_string(),
            })
        })?;

        let content_html = content_el.inner_html();
        let content_text = render_content_text(content_el);
        // 词数始终由正文重新计算，不信任页面上的任何数值
        let word_count = text::word_count(&content_text);

        let title = first_text(&document, &TITLE_SELECTORS).unwrap_or_default();
        let author = first_text(&document, &AUTHOR_SELECTORS).unwrap_or_default();
        let account_name = first_text(&document, &ACCOUNT_SELECTORS).unwrap_or_default();
        let publish_date = first_text(&document, &DATE_SELECTORS);

        let images = collect_images(content_el);

        debug!(
            "提取完成: 标题 {} 字, 正文 {} 词, 图片 {} 张",
            title.chars().count(),
            word_count,
            images.len()
        );

        Ok(ExtractedContent {
            title,
            author,
            account_name,
            publish_date,
            content_text,
            content_html,
            word_count,
            images,
        })
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 依次尝试选择器，返回第一个非空的文本
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        if let Ok(parsed) = Selector::parse(selector) {
            if let Some(el) = document.select(&parsed).next() {
                let raw = el.text().collect::<String>();
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// 渲染正文纯文本：块级标签变换行，行内空白压缩为单个空格，不留空行
fn render_content_text(content: ElementRef<'_>) -> String {
    let mut raw = String::new();
    walk_text(content, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text_node) = child.value().as_text() {
            out.push_str(text_node);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if matches!(name, "script" | "style") {
                continue;
            }
            let is_block = BLOCK_ELEMENTS.contains(&name);
            if is_block {
                out.push('\n');
            }
            walk_text(child_el, out);
            if is_block {
                out.push('\n');
            }
        }
    }
}

/// 收集正文中的图片 URL，懒加载的 data-src 优先，data: 内联图跳过
fn collect_images(content: ElementRef<'_>) -> Vec<ImageRef> {
    let mut images = Vec::new();
    let img_selector = match Selector::parse("img") {
        Ok(selector) => selector,
        Err(_) => return images,
    };

    for (index, img) in content.select(&img_selector).enumerate() {
        let src = img
            .value()
            .attr("data-src")
            .or_else(|| img.value().attr("src"));
        if let Some(src) = src {
            if !src.is_empty() && !src.starts_with("data:") {
                images.push(ImageRef {
                    index,
                    url: src.to_string(),
                });
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html() -> String {
        r#"
        <html><body>
            <h1 class="rich_media_title"> 深入理解所有权 </h1>
            <div class="rich_media_meta_list">
                <span class="rich_media_meta rich_media_meta_text">张三</span>
                <em class="rich_media_meta rich_media_meta_text">2024-03-15 08:30</em>
            </div>
            <a id="js_name">Rust 技术小组</a>
            <div id="js_content">
                <p>hello world 你好世界</p>
                <section>第二段<span>行内文本</span></section>
                <p><img data-src="https://mmbiz.qpic.cn/a.jpg" src="placeholder.gif"></p>
                <p><img src="data:image/png;base64,AAAA"></p>
                <p><img src="https://mmbiz.qpic.cn/b.png"></p>
            </div>
        </body></html>
        "#
        .to_string()
    }

    #[test]
    fn test_extract_full_article() {
        let extractor = ContentExtractor::new();
        let content = extractor
            .extract("https://mp.weixin.qq.com/s/abc", &article_html())
            .unwrap();

        assert_eq!(content.title, "深入理解所有权");
        assert_eq!(content.author, "张三");
        assert_eq!(content.account_name, "Rust 技术小组");
        assert_eq!(content.publish_date.as_deref(), Some("2024-03-15 08:30"));
        assert!(content.content_html.contains("hello world"));
    }

    #[test]
    fn test_word_count_mixed_script() {
        let extractor = ContentExtractor::new();
        let html = r#"<html><body><div id="js_content"><p>hello world 你好世界</p></div></body></html>"#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.word_count, 6);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = ContentExtractor::new();
        let html = article_html();
        let first = extractor.extract("https://u", &html).unwrap();
        let second = extractor.extract("https://u", &html).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_content_container_is_error() {
        let extractor = ContentExtractor::new();
        let html = r#"<html><body><h1>标题</h1><p>没有正文容器</p></body></html>"#;
        let result = extractor.extract("https://u", html);
        assert!(matches!(
            result,
            Err(SpiderError::Extraction(ExtractionError::ContentMissing { .. }))
        ));
    }

    #[test]
    fn test_title_falls_back_to_activity_name() {
        let extractor = ContentExtractor::new();
        let html = r#"
            <html><body>
                <h1 id="activity-name">备用标题</h1>
                <div id="js_content"><p>正文</p></div>
            </body></html>
        "#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.title, "备用标题");
    }

    #[test]
    fn test_author_falls_back_to_account_selector() {
        let extractor = ContentExtractor::new();
        let html = r#"
            <html><body>
                <a id="js_name">只有公众号名</a>
                <div id="js_content"><p>正文</p></div>
            </body></html>
        "#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.author, "只有公众号名");
        assert_eq!(content.account_name, "只有公众号名");
    }

    #[test]
    fn test_image_collection_skips_data_uri_and_keeps_index() {
        let extractor = ContentExtractor::new();
        let content = extractor.extract("https://u", &article_html()).unwrap();

        // 第 1 张是 data: 内联图被跳过，编号留空位
        assert_eq!(content.images.len(), 2);
        assert_eq!(content.images[0].index, 0);
        assert_eq!(content.images[0].url, "https://mmbiz.qpic.cn/a.jpg");
        assert_eq!(content.images[1].index, 2);
        assert_eq!(content.images[1].url, "https://mmbiz.qpic.cn/b.png");
    }

    #[test]
    fn test_content_text_paragraph_boundaries() {
        let extractor = ContentExtractor::new();
        let html = r#"
            <html><body><div id="js_content">
                <p>第一段</p>
                <section>第二段<span>续写</span></section>
                <p>第三段   多余   空白</p>
            </div></body></html>
        "#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.content_text, "第一段\n第二段续写\n第三段 多余 空白");
    }

    #[test]
    fn test_content_text_excludes_script() {
        let extractor = ContentExtractor::new();
        let html = r#"
            <html><body><div id="js_content">
                <p>正文</p>
                <script>var hidden = "不应出现";</script>
            </div></body></html>
        "#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.content_text, "正文");
    }

    #[test]
    fn test_missing_metadata_degrades_to_empty() {
        let extractor = ContentExtractor::new();
        let html = r#"<html><body><div id="js_content"><p>只有正文</p></div></body></html>"#;
        let content = extractor.extract("https://u", html).unwrap();
        assert_eq!(content.title, "");
        assert_eq!(content.author, "");
        assert_eq!(content.account_name, "");
        assert!(content.publish_date.is_none());
    }
}
