use crate::models::submission::Submission;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从单个识别文本文件构建答卷
///
/// 文件名（不含扩展名）作为学生 ID
pub async fn load_answer_file(path: &Path, exam_id: &str) -> Result<Submission> {
    let recognized_text = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取答卷文本: {}", path.display()))?;

    let student_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("无法从文件名解析学生ID: {}", path.display()))?;

    Ok(Submission::new(
        format!("{}-{}", exam_id, student_id),
        exam_id,
        student_id,
        path.to_string_lossy().to_string(),
        recognized_text,
    ))
}

/// 从文件夹中加载所有 `.txt` 答卷
///
/// 单个文件加载失败只记录警告；结果按文件名排序
pub async fn load_all_answer_files(folder_path: &str, exam_id: &str) -> Result<Vec<Submission>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut submissions = Vec::with_capacity(paths.len());
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_answer_file(&path, exam_id).await {
            Ok(submission) => submissions.push(submission),
            Err(e) => tracing::warn!("加载文件失败 {}: {}", path.display(), e),
        }
    }

    Ok(submissions)
}
