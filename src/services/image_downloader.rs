//! 图片下载服务 - 业务能力层
//!
//! 只负责把文章内嵌图片批量拉回本地，单张失败不影响其余图片，
//! 更不影响文章本身

use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ImageDownloadError, SpiderResult};
use crate::models::article::{Image, ImageStatus};
use crate::services::extractor::ImageRef;
use crate::utils::text::sanitize_dir_name;

/// 临时失败后的重试等待
const RETRY_DELAY_MS: u64 = 500;

/// 图片下载服务
///
/// 职责：
/// - 并发受 Semaphore 限制（1-8），每张图片独立下载和落盘
/// - 临时失败（连接、超时、5xx）重试一次，4xx 不重试
/// - 返回的序列与提取到的图片引用等长且顺序一致
pub struct ImageDownloader {
    client: Client,
    output_dir: PathBuf,
    concurrency: usize,
}

impl ImageDownloader {
    /// 根据配置创建下载服务
    pub fn new(config: &Config) -> SpiderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.image_timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            output_dir: PathBuf::from(&config.output_dir),
            concurrency: config.image_concurrency.clamp(1, 8),
        })
    }

    /// 下载一篇文章的全部图片
    ///
    /// # 参数
    /// - `article_url`: 文章 URL，用于推导默认输出目录
    /// - `custom_dir`: 调用方指定的目录名，清洗后为空则回退到哈希目录
    /// - `refs`: 提取阶段发现的图片引用
    ///
    /// # 返回
    /// 返回与 refs 等长的图片记录，失败的图片标记为 Failed
    pub async fn download_all(
        &self,
        article_url: &str,
        custom_dir: Option<&str>,
        refs: &[ImageRef],
    ) -> Vec<Image> {
        if refs.is_empty() {
            return Vec::new();
        }

        let dir = self.article_dir(article_url, custom_dir);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("❌ 创建图片目录失败 ({}): {}", dir.display(), e);
            return refs
                .iter()
                .map(|r| Image {
                    index: r.index,
                    url: r.url.clone(),
                    local_path: None,
                    status: ImageStatus::Failed,
                })
                .collect();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(refs.len());
        for image_ref in refs.iter().cloned() {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Image {
                            index: image_ref.index,
                            url: image_ref.url,
                            local_path: None,
                            status: ImageStatus::Failed,
                        }
                    }
                };

                match fetch_with_retry(&client, &image_ref.url, &dir, image_ref.index).await {
                    Ok(path) => Image {
                        index: image_ref.index,
                        url: image_ref.url,
                        local_path: Some(path),
                        status: ImageStatus::Downloaded,
                    },
                    Err(e) => {
                        warn!("⚠️ 图片 {} 下载失败: {}", image_ref.index, e);
                        Image {
                            index: image_ref.index,
                            url: image_ref.url,
                            local_path: None,
                            status: ImageStatus::Failed,
                        }
                    }
                }
            }));
        }

        // 按提交顺序收集，完成顺序不影响输出顺序
        let mut images = Vec::with_capacity(refs.len());
        for (image_ref, handle) in refs.iter().zip(handles) {
            match handle.await {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!("⚠️ 图片 {} 下载任务异常: {}", image_ref.index, e);
                    images.push(Image {
                        index: image_ref.index,
                        url: image_ref.url.clone(),
                        local_path: None,
                        status: ImageStatus::Failed,
                    });
                }
            }
        }
        images
    }

    /// 推导文章图片目录
    fn article_dir(&self, article_url: &str, custom_dir: Option<&str>) -> PathBuf {
        if let Some(name) = custom_dir {
            let cleaned = sanitize_dir_name(name);
            if !cleaned.is_empty() {
                return self.output_dir.join(cleaned);
            }
            warn!("⚠️ 自定义目录名清洗后为空，回退到 URL 哈希目录");
        }
        let mut hasher = Sha256::new();
        hasher.update(article_url.as_bytes());
        let hash = hex::encode(hasher.finalize());
        self.output_dir.join(&hash[..8])
    }
}

/// 下载单张图片，临时失败重试一次
async fn fetch_with_retry(
    client: &Client,
    url: &str,
    dir: &Path,
    index: usize,
) -> Result<String, ImageDownloadError> {
    match fetch_and_save(client, url, dir, index).await {
        Ok(path) => Ok(path),
        Err(e) if is_transient(&e) => {
            debug!("图片下载临时失败，重试一次: {}", e);
            sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            fetch_and_save(client, url, dir, index).await
        }
        Err(e) => Err(e),
    }
}

async fn fetch_and_save(
    client: &Client,
    url: &str,
    dir: &Path,
    index: usize,
) -> Result<String, ImageDownloadError> {
    let response =
        client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageDownloadError::RequestFailed {
                url: url.to_string(),
                source: Box::new(e),
            })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageDownloadError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ImageDownloadError::RequestFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

    let filename = format!("image_{:03}{}", index, extension_for(&content_type));
    let path = dir.join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ImageDownloadError::WriteFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

    debug!("✓ 已下载: {}", filename);
    Ok(path.display().to_string())
}

/// 连接失败和 5xx 算临时失败，4xx 和写盘失败不重试
fn is_transient(error: &ImageDownloadError) -> bool {
    match error {
        ImageDownloadError::RequestFailed { .. } => true,
        ImageDownloadError::BadStatus { status, .. } => *status >= 500,
        ImageDownloadError::WriteFailed { .. } => false,
    }
}

/// 根据 Content-Type 推导文件扩展名，未知类型按 jpg 处理
fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("jpeg") || content_type.contains("jpg") {
        ".jpg"
    } else if content_type.contains("png") {
        ".png"
    } else if content_type.contains("gif") {
        ".gif"
    } else if content_type.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(output_dir: &str) -> Config {
        Config {
            output_dir: output_dir.to_string(),
            image_concurrency: 3,
            image_timeout_secs: 5,
            ..Config::default()
        }
    }

    fn refs(urls: &[&str]) -> Vec<ImageRef> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| ImageRef {
                index,
                url: url.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("image/png"), ".png");
        assert_eq!(extension_for("image/gif"), ".gif");
        assert_eq!(extension_for("image/webp"), ".webp");
        assert_eq!(extension_for("application/octet-stream"), ".jpg");
        assert_eq!(extension_for(""), ".jpg");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_others() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8]),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, 0x50]),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(&test_config(dir.path().to_str().unwrap())).unwrap();

        let url_a = format!("{}/a.jpg", mock_server.uri());
        let url_b = format!("{}/b.jpg", mock_server.uri());
        let url_c = format!("{}/c.png", mock_server.uri());
        let image_refs = refs(&[url_a.as_str(), url_b.as_str(), url_c.as_str()]);
        let images = downloader
            .download_all("https://mp.weixin.qq.com/s/abc", None, &image_refs)
            .await;

        assert_eq!(images.len(), 3);
        assert_eq!(images[0].index, 0);
        assert_eq!(images[0].status, ImageStatus::Downloaded);
        assert_eq!(images[1].index, 1);
        assert_eq!(images[1].status, ImageStatus::Failed);
        assert!(images[1].local_path.is_none());
        assert_eq!(images[2].index, 2);
        assert_eq!(images[2].status, ImageStatus::Downloaded);

        // 文件名来自 Content-Type 和图片编号
        let path0 = images[0].local_path.as_deref().unwrap();
        let path2 = images[2].local_path.as_deref().unwrap();
        assert!(path0.ends_with("image_000.jpg"), "{}", path0);
        assert!(path2.ends_with("image_002.png"), "{}", path2);
        assert!(std::path::Path::new(path0).exists());
        assert!(std::path::Path::new(path2).exists());
    }

    #[tokio::test]
    async fn test_server_error_retried_once() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(&test_config(dir.path().to_str().unwrap())).unwrap();

        let url = format!("{}/flaky.jpg", mock_server.uri());
        let image_refs = refs(&[url.as_str()]);
        let images = downloader.download_all("https://u", None, &image_refs).await;
        assert_eq!(images[0].status, ImageStatus::Failed);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(&test_config(dir.path().to_str().unwrap())).unwrap();

        let url = format!("{}/gone.jpg", mock_server.uri());
        let image_refs = refs(&[url.as_str()]);
        let images = downloader.download_all("https://u", None, &image_refs).await;
        assert_eq!(images[0].status, ImageStatus::Failed);
    }

    #[tokio::test]
    async fn test_custom_dir_sanitized() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1]),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(&test_config(dir.path().to_str().unwrap())).unwrap();

        let url = format!("{}/a.jpg", mock_server.uri());
        let image_refs = refs(&[url.as_str()]);
        let images = downloader
            .download_all("https://u", Some("../my article!"), &image_refs)
            .await;

        // 路径分隔符和特殊字符被清洗，只剩 "myarticle"
        let saved = images[0].local_path.as_deref().unwrap();
        assert!(saved.contains("myarticle"), "{}", saved);
        assert!(!saved.contains(".."));
    }

    #[tokio::test]
    async fn test_default_dir_is_url_hash() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1]),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(&test_config(dir.path().to_str().unwrap())).unwrap();

        let url = format!("{}/a.jpg", mock_server.uri());
        let image_refs = refs(&[url.as_str()]);
        let images = downloader
            .download_all("https://mp.weixin.qq.com/s/abc", None, &image_refs)
            .await;

        let saved = PathBuf::from(images[0].local_path.as_deref().unwrap());
        let article_dir = saved.parent().unwrap().file_name().unwrap().to_str().unwrap();
        assert_eq!(article_dir.len(), 8);
        assert!(article_dir.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
