use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::models::batch::BatchTask;

/// 从 TOML 文件加载批量抓取任务
pub async fn load_batch_task(task_file_path: &Path) -> Result<BatchTask> {
    let content = fs::read_to_string(task_file_path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", task_file_path.display()))?;

    let task: BatchTask = toml::from_str(&content)
        .with_context(|| format!("无法解析任务文件: {}", task_file_path.display()))?;

    if task.urls.is_empty() {
        anyhow::bail!("任务文件中没有 URL: {}", task_file_path.display());
    }

    tracing::info!("成功加载任务文件: {} 个 URL", task.urls.len());

    Ok(task)
}
