use serde::{Deserialize, Serialize};

use crate::models::article::{Article, ArticleStatus};

/// 批量抓取中单个 URL 的失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,
    pub status: ArticleStatus,
    pub message: String,
}

impl ErrorRecord {
    /// 被验证页拦截的记录
    pub fn blocked(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: ArticleStatus::Blocked,
            message: message.into(),
        }
    }

    /// 其他失败的记录
    pub fn error(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: ArticleStatus::Error,
            message: message.into(),
        }
    }
}

/// 批量抓取中单个 URL 的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Article(Article),
    Error(ErrorRecord),
}

impl BatchOutcome {
    pub fn url(&self) -> &str {
        match self {
            BatchOutcome::Article(a) => &a.url,
            BatchOutcome::Error(e) => &e.url,
        }
    }

    pub fn status(&self) -> ArticleStatus {
        match self {
            BatchOutcome::Article(a) => a.status,
            BatchOutcome::Error(e) => e.status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == ArticleStatus::Success
    }
}

/// 批量抓取结果
///
/// entries 与输入 URL 等长且顺序一致，任何 URL 都不会被静默丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub entries: Vec<BatchOutcome>,
    pub success_count: usize,
    pub blocked_count: usize,
    pub error_count: usize,
}

impl BatchResult {
    /// 从条目列表构建结果，计数由条目状态推导
    pub fn from_entries(entries: Vec<BatchOutcome>) -> Self {
        let mut success_count = 0;
        let mut blocked_count = 0;
        let mut error_count = 0;
        for entry in &entries {
            match entry.status() {
                ArticleStatus::Success => success_count += 1,
                ArticleStatus::Blocked => blocked_count += 1,
                ArticleStatus::Error => error_count += 1,
            }
        }
        Self {
            entries,
            success_count,
            blocked_count,
            error_count,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// TOML 批量任务文件
///
/// ```toml
/// urls = ["https://mp.weixin.qq.com/s/aaa", "https://mp.weixin.qq.com/s/bbb"]
/// download_images = false
/// max_articles = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BatchTask {
    pub urls: Vec<String>,
    #[serde(default)]
    pub download_images: Option<bool>,
    #[serde(default)]
    pub max_articles: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_derived_from_entries() {
        let entries = vec![
            BatchOutcome::Error(ErrorRecord::blocked("https://a", "触发验证")),
            BatchOutcome::Error(ErrorRecord::error("https://b", "超时")),
            BatchOutcome::Error(ErrorRecord::error("https://c", "网络错误")),
        ];
        let result = BatchResult::from_entries(entries);
        assert_eq!(result.len(), 3);
        assert_eq!(result.success_count, 0);
        assert_eq!(result.blocked_count, 1);
        assert_eq!(result.error_count, 2);
    }

    #[test]
    fn test_error_record_serializes_flat() {
        let outcome = BatchOutcome::Error(ErrorRecord::blocked("https://a", "需要验证"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["url"], "https://a");
        assert_eq!(json["status"], "blocked");
        assert_eq!(json["message"], "需要验证");
    }

    #[test]
    fn test_batch_task_toml_parse() {
        let toml_text = r#"
urls = ["https://mp.weixin.qq.com/s/aaa"]
download_images = false
"#;
        let task: BatchTask = toml::from_str(toml_text).unwrap();
        assert_eq!(task.urls.len(), 1);
        assert_eq!(task.download_images, Some(false));
        assert_eq!(task.max_articles, None);
    }
}
