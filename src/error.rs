use std::fmt;

/// 爬虫错误类型
#[derive(Debug)]
pub enum SpiderError {
    /// 浏览器驱动错误
    Driver(DriverError),
    /// 网络请求错误
    Network(NetworkError),
    /// 触发反爬验证，需要人工完成验证后重新导入 Cookie
    VerificationRequired { url: String, marker: String },
    /// 页面加载超时
    Timeout { url: String, timeout_secs: u64 },
    /// 内容提取错误
    Extraction(ExtractionError),
    /// 图片下载错误
    ImageDownload(ImageDownloadError),
    /// 会话存储错误
    Session(SessionError),
    /// 配置错误
    Config(ConfigError),
    /// URL 校验失败
    InvalidUrl { url: String, reason: String },
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for SpiderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiderError::Driver(e) => write!(f, "浏览器驱动错误: {}", e),
            SpiderError::Network(e) => write!(f, "网络错误: {}", e),
            SpiderError::VerificationRequired { url, marker } => {
                write!(f, "触发微信验证页 ({}): 检测到标记 '{}'", url, marker)
            }
            SpiderError::Timeout { url, timeout_secs } => {
                write!(f, "页面加载超时 ({}): 超过 {} 秒", url, timeout_secs)
            }
            SpiderError::Extraction(e) => write!(f, "内容提取错误: {}", e),
            SpiderError::ImageDownload(e) => write!(f, "图片下载错误: {}", e),
            SpiderError::Session(e) => write!(f, "会话存储错误: {}", e),
            SpiderError::Config(e) => write!(f, "配置错误: {}", e),
            SpiderError::InvalidUrl { url, reason } => {
                write!(f, "URL 不合法 ({}): {}", url, reason)
            }
            SpiderError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for SpiderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpiderError::Driver(e) => Some(e),
            SpiderError::Network(e) => Some(e),
            SpiderError::Extraction(e) => Some(e),
            SpiderError::ImageDownload(e) => Some(e),
            SpiderError::Session(e) => Some(e),
            SpiderError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// 浏览器驱动错误
#[derive(Debug)]
pub enum DriverError {
    /// 连接调试端口失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置构建失败
    ConfigurationFailed { detail: String },
    /// agent-browser 命令执行失败
    CommandFailed { command: String, detail: String },
    /// agent-browser 输出解析失败
    OutputParseFailed { command: String, output: String },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            DriverError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            DriverError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            DriverError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            DriverError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            DriverError::ConfigurationFailed { detail } => {
                write!(f, "构建浏览器配置失败: {}", detail)
            }
            DriverError::CommandFailed { command, detail } => {
                write!(f, "agent-browser {} 执行失败: {}", command, detail)
            }
            DriverError::OutputParseFailed { command, output } => {
                write!(f, "agent-browser {} 输出无法解析: {}", command, output)
            }
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::ConnectionFailed { source, .. }
            | DriverError::LaunchFailed { source }
            | DriverError::PageCreationFailed { source }
            | DriverError::NavigationFailed { source, .. }
            | DriverError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 网络请求错误
#[derive(Debug)]
pub enum NetworkError {
    /// 请求发送失败（连接、DNS、超时）
    RequestFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目标返回非成功状态码
    BadStatus { url: String, status: u16 },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::RequestFailed { url, source } => {
                write!(f, "请求失败 ({}): {}", url, source)
            }
            NetworkError::BadStatus { url, status } => {
                write!(f, "请求返回状态码 {} ({})", status, url)
            }
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::RequestFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 内容提取错误
#[derive(Debug)]
pub enum ExtractionError {
    /// 正文容器 #js_content 缺失
    ContentMissing { url: String },
    /// 页面结构无法识别（既非文章页也非验证页）
    StructureUnrecognized { url: String },
    /// 选择器本身不合法
    InvalidSelector { selector: String },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::ContentMissing { url } => {
                write!(f, "页面缺少正文容器 #js_content ({})", url)
            }
            ExtractionError::StructureUnrecognized { url } => {
                write!(f, "页面结构无法识别，可能是加载失败或版式变更 ({})", url)
            }
            ExtractionError::InvalidSelector { selector } => {
                write!(f, "CSS 选择器不合法: {}", selector)
            }
        }
    }
}

impl std::error::Error for ExtractionError {}

/// 图片下载错误（单张图片级别，不会中断文章）
#[derive(Debug)]
pub enum ImageDownloadError {
    /// 请求失败
    RequestFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 非成功状态码
    BadStatus { url: String, status: u16 },
    /// 写入本地文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ImageDownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDownloadError::RequestFailed { url, source } => {
                write!(f, "下载失败 ({}): {}", url, source)
            }
            ImageDownloadError::BadStatus { url, status } => {
                write!(f, "下载返回状态码 {} ({})", status, url)
            }
            ImageDownloadError::WriteFailed { path, source } => {
                write!(f, "写入图片失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ImageDownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageDownloadError::RequestFailed { source, .. }
            | ImageDownloadError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 会话存储错误
#[derive(Debug)]
pub enum SessionError {
    /// 读取会话文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入会话文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 序列化/解析失败
    JsonFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ReadFailed { path, source } => {
                write!(f, "读取会话文件失败 ({}): {}", path, source)
            }
            SessionError::WriteFailed { path, source } => {
                write!(f, "写入会话文件失败 ({}): {}", path, source)
            }
            SessionError::JsonFailed { source } => {
                write!(f, "会话 JSON 解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::ReadFailed { source, .. }
            | SessionError::WriteFailed { source, .. }
            | SessionError::JsonFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 后端名称无法识别
    UnknownBackend { value: String },
    /// 配置值不合法
    InvalidValue { field: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownBackend { value } => {
                write!(f, "未知的浏览器后端: '{}' (支持 chromium / agent)", value)
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "配置项 {} 的值不合法: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<SpiderError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for SpiderError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        SpiderError::Driver(DriverError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for SpiderError {
    fn from(err: serde_json::Error) -> Self {
        SpiderError::Session(SessionError::JsonFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for SpiderError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        SpiderError::Network(NetworkError::RequestFailed {
            url,
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for SpiderError {
    fn from(err: std::io::Error) -> Self {
        SpiderError::Session(SessionError::ReadFailed {
            path: String::new(), // IO 错误本身不携带路径信息
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl SpiderError {
    /// 创建浏览器连接错误
    pub fn connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SpiderError::Driver(DriverError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SpiderError::Driver(DriverError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建验证拦截错误
    pub fn verification_required(url: impl Into<String>, marker: impl Into<String>) -> Self {
        SpiderError::VerificationRequired {
            url: url.into(),
            marker: marker.into(),
        }
    }

    /// 创建页面加载超时错误
    pub fn timeout(url: impl Into<String>, timeout_secs: u64) -> Self {
        SpiderError::Timeout {
            url: url.into(),
            timeout_secs,
        }
    }

    /// 创建 URL 校验错误
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        SpiderError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// 创建 agent-browser 命令执行错误
    pub fn agent_command_failed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        SpiderError::Driver(DriverError::CommandFailed {
            command: command.into(),
            detail: detail.into(),
        })
    }

    /// 是否为验证拦截（调用方据此走人工验证流程）
    pub fn is_verification(&self) -> bool {
        matches!(self, SpiderError::VerificationRequired { .. })
    }
}

// ========== Result 类型别名 ==========

/// 爬虫结果类型
pub type SpiderResult<T> = Result<T, SpiderError>;
