/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器后端: "chromium" 或 "agent"
    pub backend: String,
    /// 是否下载文章图片
    pub download_images: bool,
    /// 页面加载超时（秒）
    pub page_load_timeout_secs: u64,
    /// 导航完成后等待动态内容渲染的时间（秒）
    pub dynamic_wait_secs: u64,
    /// 文章与图片的输出目录
    pub output_dir: String,
    /// 会话文件路径
    pub session_file: String,
    /// 会话有效期（小时）
    pub session_ttl_hours: u64,
    /// 批量抓取的文章间隔（秒）
    pub batch_delay_secs: u64,
    /// 间隔上限抖动（秒，0 表示固定间隔）
    pub batch_jitter_secs: u64,
    /// 单次运行最多抓取的文章数
    pub max_articles_per_run: usize,
    /// 图片并发下载数（1-8）
    pub image_concurrency: usize,
    /// 单张图片下载超时（秒）
    pub image_timeout_secs: u64,
    /// Chrome/Edge 可执行文件路径（空表示自动探测）
    pub chrome_executable: String,
    /// 浏览器调试端口（0 表示启动新的无头浏览器而非附加）
    pub browser_debug_port: u16,
    // --- agent-browser 后端配置 ---
    pub agent_browser_bin: String,
    pub agent_session: String,
    pub browser_state_file: String,
    /// 请求使用的 User-Agent
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "chromium".to_string(),
            download_images: true,
            page_load_timeout_secs: 10,
            dynamic_wait_secs: 2,
            output_dir: "weixin_articles".to_string(),
            session_file: "weixin_session.json".to_string(),
            session_ttl_hours: 24,
            batch_delay_secs: 15,
            batch_jitter_secs: 5,
            max_articles_per_run: 50,
            image_concurrency: 3,
            image_timeout_secs: 15,
            chrome_executable: String::new(),
            browser_debug_port: 0,
            agent_browser_bin: "agent-browser".to_string(),
            agent_session: "weixin".to_string(),
            browser_state_file: "browser_state.json".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            backend: std::env::var("BROWSER_BACKEND").unwrap_or(default.backend),
            download_images: std::env::var("DOWNLOAD_IMAGES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.download_images),
            page_load_timeout_secs: std::env::var("PAGE_LOAD_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_load_timeout_secs),
            dynamic_wait_secs: std::env::var("WAIT_TIME").ok().and_then(|v| v.parse().ok()).unwrap_or(default.dynamic_wait_secs),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            session_file: std::env::var("SESSION_FILE").unwrap_or(default.session_file),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.session_ttl_hours),
            batch_delay_secs: std::env::var("BATCH_DELAY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_delay_secs),
            batch_jitter_secs: std::env::var("BATCH_JITTER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_jitter_secs),
            max_articles_per_run: std::env::var("MAX_ARTICLES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_articles_per_run),
            image_concurrency: std::env::var("IMAGE_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.image_concurrency),
            image_timeout_secs: std::env::var("IMAGE_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.image_timeout_secs),
            chrome_executable: std::env::var("CHROME_PATH").unwrap_or(default.chrome_executable),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            agent_browser_bin: std::env::var("AGENT_BROWSER_BIN").unwrap_or(default.agent_browser_bin),
            agent_session: std::env::var("AGENT_SESSION").unwrap_or(default.agent_session),
            browser_state_file: std::env::var("BROWSER_STATE_FILE").unwrap_or(default.browser_state_file),
            user_agent: std::env::var("USER_AGENT").unwrap_or(default.user_agent),
        }
    }
}
