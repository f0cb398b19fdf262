//! agent 后端 - 通过 agent-browser 命令行驱动 Playwright
//!
//! 每个操作是一次子进程调用：
//!   agent-browser --session <name> --json <子命令>
//! 输出为 {success, data, error} 包装的 JSON，偶尔混有非 JSON 行。
//! Cookie 通过 Playwright storage-state 文件与 CLI 交换

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::browser::{Backend, BrowserDriver, DEFAULT_COOKIE_DOMAIN};
use crate::config::Config;
use crate::error::{DriverError, SessionError, SpiderError, SpiderResult};
use crate::models::{Cookie, Session};
use crate::utils::text::truncate_text;

/// 单次 CLI 调用的兜底超时（秒）
const COMMAND_TIMEOUT_SECS: u64 = 60;

/// Playwright storage-state 文件
#[derive(Debug, Serialize, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: Vec<StateCookie>,
    #[serde(default)]
    origins: Vec<Value>,
}

/// storage-state 里的 Cookie 条目，字段名是 Playwright 的驼峰风格
#[derive(Debug, Serialize, Deserialize)]
struct StateCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: String,
    #[serde(default = "default_path")]
    path: String,
    /// 会话级 Cookie 记为 -1
    #[serde(default = "session_expires")]
    expires: f64,
    #[serde(default, rename = "httpOnly")]
    http_only: bool,
    #[serde(default)]
    secure: bool,
    #[serde(default = "default_same_site", rename = "sameSite")]
    same_site: String,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expires() -> f64 {
    -1.0
}

fn default_same_site() -> String {
    "Lax".to_string()
}

/// agent-browser CLI 驱动
pub struct AgentDriver {
    bin: String,
    session_name: String,
    state_file: PathBuf,
    settle_secs: u64,
    session_ttl_secs: u64,
}

impl AgentDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            bin: config.agent_browser_bin.clone(),
            session_name: config.agent_session.clone(),
            state_file: PathBuf::from(&config.browser_state_file),
            settle_secs: config.dynamic_wait_secs,
            session_ttl_secs: config.session_ttl_hours * 3600,
        }
    }

    /// 执行一条 agent-browser 命令，返回 stdout
    async fn run_cmd(&self, args: &[&str], timeout_secs: u64) -> SpiderResult<String> {
        let label = args.join(" ");
        debug!("agent-browser {}", label);

        let mut cmd = Command::new(&self.bin);
        cmd.arg("--session")
            .arg(&self.session_name)
            .arg("--json")
            .args(args)
            // 超时后不留下还在跑的子进程
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| {
                SpiderError::agent_command_failed(&label, format!("执行超过 {} 秒", timeout_secs))
            })?
            .map_err(|e| SpiderError::agent_command_failed(&label, e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(SpiderError::agent_command_failed(&label, stderr))
        }
    }

    /// 解析 CLI 输出，解开 {success, data, error} 包装
    ///
    /// 输出偶尔混有启动横幅等非 JSON 行，整体解析失败后逐行扫描
    fn parse_payload(command: &str, output: &str) -> SpiderResult<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(output) {
            return Self::check_reply(command, value);
        }
        for line in output.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                    return Self::check_reply(command, value);
                }
            }
        }
        Err(SpiderError::Driver(DriverError::OutputParseFailed {
            command: command.to_string(),
            output: truncate_text(output, 200),
        }))
    }

    /// 检查包装中的 success/error，取出 data
    fn check_reply(command: &str, value: Value) -> SpiderResult<Value> {
        if let Value::Object(mut map) = value {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                let detail = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("未知错误")
                    .to_string();
                return Err(SpiderError::agent_command_failed(command, detail));
            }
            if map.contains_key("data") {
                return Ok(map.remove("data").unwrap_or(Value::Null));
            }
            return Ok(Value::Object(map));
        }
        Ok(value)
    }
}

#[async_trait]
impl BrowserDriver for AgentDriver {
    async fn navigate(&mut self, url: &str) -> SpiderResult<()> {
        debug!("导航到: {}", url);
        self.run_cmd(&["open", url], COMMAND_TIMEOUT_SECS).await?;
        Ok(())
    }

    async fn wait_for_load(&mut self, timeout_secs: u64) -> SpiderResult<()> {
        // 固定等待让 JS 有时间渲染
        let settle_ms = self.settle_secs * 1000;
        if settle_ms > 0 {
            self.run_cmd(
                &["wait", &settle_ms.to_string()],
                self.settle_secs + COMMAND_TIMEOUT_SECS,
            )
            .await?;
        }

        // 等正文容器出现。验证页没有这个节点，等不到不算失败，
        // 快照交给后面的检测环节分类
        if let Err(e) = self.run_cmd(&["wait", "#js_content"], timeout_secs + 10).await {
            debug!("未等到正文容器: {}", e);
        }
        Ok(())
    }

    async fn dom_snapshot(&mut self) -> SpiderResult<String> {
        let output = self.run_cmd(&["get", "html", "html"], COMMAND_TIMEOUT_SECS).await?;
        let payload = Self::parse_payload("get html", &output)?;
        match payload {
            Value::String(html) => {
                debug!("获取 DOM 快照: {} 字节", html.len());
                Ok(html)
            }
            other => Err(SpiderError::Driver(DriverError::OutputParseFailed {
                command: "get html".to_string(),
                output: truncate_text(&other.to_string(), 200),
            })),
        }
    }

    async fn get_cookies(&mut self) -> SpiderResult<Session> {
        let state_path = self.state_file.display().to_string();
        self.run_cmd(&["state", "save", &state_path], COMMAND_TIMEOUT_SECS)
            .await?;

        let raw = tokio::fs::read_to_string(&self.state_file)
            .await
            .map_err(|e| {
                SpiderError::Session(SessionError::ReadFailed {
                    path: state_path.clone(),
                    source: Box::new(e),
                })
            })?;
        let state: StorageState = serde_json::from_str(&raw)?;

        let cookies: Vec<Cookie> = state
            .cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: (c.expires > 0.0).then_some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        debug!("导出 {} 条 Cookie", cookies.len());
        Ok(Session::new(
            Backend::Agent.as_str(),
            cookies,
            self.session_ttl_secs,
        ))
    }

    async fn set_cookies(&mut self, session: &Session) -> SpiderResult<()> {
        if session.is_empty() {
            return Ok(());
        }

        let state = StorageState {
            cookies: session
                .cookies
                .iter()
                .map(|c| StateCookie {
                    name: c.name.clone(),
                    value: c.value.clone(),
                    domain: if c.domain.is_empty() {
                        DEFAULT_COOKIE_DOMAIN.to_string()
                    } else {
                        c.domain.clone()
                    },
                    path: c.path.clone(),
                    expires: c.expires.unwrap_or(-1.0),
                    http_only: c.http_only,
                    secure: c.secure,
                    same_site: default_same_site(),
                })
                .collect(),
            origins: Vec::new(),
        };

        let state_path = self.state_file.display().to_string();
        let json = serde_json::to_string_pretty(&state)?;
        tokio::fs::write(&self.state_file, json).await.map_err(|e| {
            SpiderError::Session(SessionError::WriteFailed {
                path: state_path.clone(),
                source: Box::new(e),
            })
        })?;

        self.run_cmd(&["state", "load", &state_path], COMMAND_TIMEOUT_SECS)
            .await?;
        info!("✓ 已应用 {} 条 Cookie", session.len());
        Ok(())
    }

    async fn close(&mut self) -> SpiderResult<()> {
        if let Err(e) = self.run_cmd(&["close"], 10).await {
            warn!("关闭 agent-browser 会话失败: {}", e);
        }
        info!("🛑 浏览器驱动已关闭");
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload_unwraps_data() {
        let output = r#"{"success": true, "data": "<html></html>"}"#;
        let payload = AgentDriver::parse_payload("get html", output).unwrap();
        assert_eq!(payload, Value::String("<html></html>".to_string()));
    }

    #[test]
    fn test_parse_payload_skips_banner_lines() {
        let output = "agent-browser v1.2.0\n{\"success\": true, \"data\": 3}";
        let payload = AgentDriver::parse_payload("get count", output).unwrap();
        assert_eq!(payload, Value::from(3));
    }

    #[test]
    fn test_parse_payload_surfaces_cli_error() {
        let output = r#"{"success": false, "error": "no active page"}"#;
        let err = AgentDriver::parse_payload("get html", output).unwrap_err();
        assert!(err.to_string().contains("no active page"));
    }

    #[test]
    fn test_parse_payload_rejects_plain_text() {
        let err = AgentDriver::parse_payload("get html", "not json at all").unwrap_err();
        assert!(matches!(
            err,
            SpiderError::Driver(DriverError::OutputParseFailed { .. })
        ));
    }

    #[test]
    fn test_parse_payload_passes_through_unwrapped_json() {
        let payload = AgentDriver::parse_payload("get count", "42").unwrap();
        assert_eq!(payload, Value::from(42));
    }

    #[test]
    fn test_storage_state_reads_playwright_fields() {
        let raw = r#"{
            "cookies": [
                {
                    "name": "wxuin",
                    "value": "123",
                    "domain": ".weixin.qq.com",
                    "expires": 1735689600,
                    "httpOnly": true,
                    "secure": true,
                    "sameSite": "Lax"
                }
            ],
            "origins": []
        }"#;
        let state: StorageState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies.len(), 1);
        let cookie = &state.cookies[0];
        assert!(cookie.http_only);
        assert_eq!(cookie.expires, 1735689600.0);
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn test_storage_state_writes_camel_case() {
        let state = StorageState {
            cookies: vec![StateCookie {
                name: "uin".to_string(),
                value: "o1".to_string(),
                domain: ".weixin.qq.com".to_string(),
                path: "/".to_string(),
                expires: -1.0,
                http_only: true,
                secure: false,
                same_site: "Lax".to_string(),
            }],
            origins: Vec::new(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"httpOnly\":true"));
        assert!(json.contains("\"sameSite\":\"Lax\""));
    }
}
