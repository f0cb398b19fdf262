use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单条 Cookie
///
/// 字段对齐浏览器导出格式，expiry 是 selenium 风格导出的别名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default, alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: default_cookie_path(),
            expires: None,
            http_only: false,
            secure: false,
        }
    }
}

/// 浏览器会话（Cookie 集合 + 有效期元数据）
///
/// 以 backend 标识归属的后端，加载时后端不匹配视为无会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub backend: String,
    pub captured_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub cookies: Vec<Cookie>,
}

impl Session {
    /// 创建以当前时间为捕获时间的会话
    pub fn new(backend: impl Into<String>, cookies: Vec<Cookie>, ttl_seconds: u64) -> Self {
        Self {
            backend: backend.into(),
            captured_at: Utc::now(),
            ttl_seconds,
            cookies,
        }
    }

    /// 判断会话在给定时刻是否仍然有效
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.captured_at).num_seconds() < self.ttl_seconds as i64
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_ttl_expiry() {
        let session = Session::new("chromium", vec![Cookie::new("a", "1")], 1);
        let now = session.captured_at;
        assert!(session.is_valid(now));
        assert!(!session.is_valid(now + Duration::seconds(2)));
    }

    #[test]
    fn test_cookie_accepts_selenium_expiry_alias() {
        let json = r#"{"name": "wxuin", "value": "123", "domain": ".weixin.qq.com", "expiry": 1735689600}"#;
        let cookie: Cookie = serde_json::from_str(json).unwrap();
        assert_eq!(cookie.name, "wxuin");
        assert_eq!(cookie.expires, Some(1735689600.0));
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn test_session_json_roundtrip() {
        let session = Session::new(
            "agent",
            vec![Cookie::new("uin", "o123"), Cookie::new("key", "v")],
            86400,
        );
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.backend, "agent");
        assert_eq!(back.cookies, session.cookies);
        assert_eq!(back.ttl_seconds, 86400);
    }
}
