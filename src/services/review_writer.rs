//! 复核清单写入服务 - 业务能力层
//!
//! 只负责"写 review.txt"能力，不关心流程

use anyhow::Result;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::QuestionResult;
use crate::utils::logging::truncate_text;

/// 复核清单写入服务
///
/// 职责：
/// - 将需要人工复核的题目追加写入复核清单
/// - 只处理单个题目
/// - 不关心流程顺序
pub struct ReviewWriter {
    review_file_path: String,
}

impl ReviewWriter {
    pub fn new() -> Self {
        Self {
            review_file_path: "review.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            review_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.review_file_path
    }

    /// 追加一条复核记录
    ///
    /// # 参数
    /// - `submission_id`: 提交ID
    /// - `result`: 需要复核的题目结果
    pub async fn write(&self, submission_id: &str, result: &QuestionResult) -> Result<()> {
        debug!(
            "写入复核记录: 提交 {} | 题目 {} | 置信度 {:.2}",
            submission_id, result.question_id, result.confidence
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.review_file_path)
            .await?;

        let line = format!(
            "提交 {} | 题目 {} | 得分 {}/{} | 置信度 {:.2} | {} | 作答: {}\n",
            submission_id,
            result.question_id,
            result.marks_obtained,
            result.max_marks,
            result.confidence,
            result.feedback,
            truncate_text(&result.extracted_answer, 80)
        );

        file.write_all(line.as_bytes()).await?;

        Ok(())
    }
}

impl Default for ReviewWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_appends_lines() {
        let path = std::env::temp_dir().join(format!("answer_grader_review_{}.txt", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;
        let writer = ReviewWriter::with_path(path.to_string_lossy().to_string());

        let result = QuestionResult {
            question_id: 3,
            extracted_answer: "photosynthesis happens in leaves".to_string(),
            marks_obtained: 2.0,
            max_marks: 5.0,
            feedback: "Partial answer, missing key points".to_string(),
            similarity: Some(0.55),
            confidence: 0.65,
        };

        writer.write("exam-alice", &result).await.unwrap();
        writer.write("exam-bob", &result).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("提交 exam-alice | 题目 3 | 得分 2/5 | 置信度 0.65"));
        assert!(lines[1].contains("exam-bob"));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
