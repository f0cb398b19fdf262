//! 验证页识别服务 - 业务能力层
//!
//! 只负责判断一份页面快照是正常文章页、反爬验证页还是无法识别，
//! 不触碰浏览器，也不关心流程

use scraper::{ElementRef, Html, Selector};

/// 反爬验证页的文本标记，命中任意一个即判定为拦截
const BLOCK_MARKERS: [&str; 2] = ["环境异常", "完成验证"];

/// 正常文章页的标题标记
const TITLE_MARKERS: [&str; 2] = ["h1.rich_media_title", "#activity-name"];

/// 正文容器选择器
const CONTENT_MARKER: &str = "#js_content";

/// 页面分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVerdict {
    /// 正常文章页
    Clean,
    /// 被验证页拦截，携带命中的标记文本
    Blocked { marker: String },
    /// 既没有验证标记也没有文章结构，视为加载失败或版式变更
    Errored,
}

/// 验证页识别服务
///
/// 职责：
/// - 对页面快照做纯函数分类，同一快照永远得到同一结论
/// - 拦截标记的优先级高于文章标记：漏判验证页比误判代价更高
pub struct VerificationDetector;

impl VerificationDetector {
    pub fn new() -> Self {
        Self
    }

    /// 对页面快照分类
    ///
    /// # 参数
    /// - `html`: 页面 DOM 快照
    ///
    /// # 返回
    /// 返回 [`PageVerdict`]
    pub fn classify(&self, html: &str) -> PageVerdict {
        let document = Html::parse_document(html);

        // 验证标记只在可见文本中查找，script/style 里的同名字符串不算命中
        let mut body_text = String::new();
        collect_visible_text(document.root_element(), &mut body_text);
        for marker in BLOCK_MARKERS {
            if body_text.contains(marker) {
                return PageVerdict::Blocked {
                    marker: marker.to_string(),
                };
            }
        }

        let has_title = TITLE_MARKERS
            .iter()
            .any(|selector| has_match(&document, selector));
        let has_content = has_match(&document, CONTENT_MARKER);

        if has_title && has_content {
            PageVerdict::Clean
        } else {
            PageVerdict::Errored
        }
    }
}

impl Default for VerificationDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn has_match(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if matches!(child_el.value().name(), "script" | "style") {
                continue;
            }
            collect_visible_text(child_el, out);
        }
    }
}
