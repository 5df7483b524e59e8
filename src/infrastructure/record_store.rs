//! 记录存储 - 基础设施层
//!
//! 存储本身不在本系统范围内，这里只定义端口（insert / update / 按键查询）
//! 并提供一个进程内实现，供驱动程序和测试使用

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{ExtractedAnswer, ManualOverride, QuestionResult, Submission, SubmissionStatus};

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("记录已存在: {0}")]
    Duplicate(String),

    #[error("存储后端错误: {0}")]
    Backend(String),
}

/// 记录存储端口
///
/// 提交的 `status` 字段充当评分租约：`try_begin_grading` 必须是原子的
/// 比较并交换，保证同一份提交不会同时有两次评分在进行
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_submission(&self, submission: Submission) -> Result<(), StoreError>;

    async fn get_submission(&self, submission_id: &str) -> Result<Submission, StoreError>;

    async fn submissions_for_exam(&self, exam_id: &str) -> Result<Vec<Submission>, StoreError>;

    /// 尝试获取评分租约，成功时状态变为 `Processing`
    async fn try_begin_grading(&self, submission_id: &str) -> Result<bool, StoreError>;

    /// 释放租约并写入最终状态
    async fn finish_grading(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> Result<(), StoreError>;

    /// 整体替换某份提交的切分结果
    async fn save_answers(
        &self,
        submission_id: &str,
        answers: Vec<ExtractedAnswer>,
    ) -> Result<(), StoreError>;

    async fn answers_for(&self, submission_id: &str) -> Result<Vec<ExtractedAnswer>, StoreError>;

    /// 整体替换某份提交的 AI 评分结果
    async fn save_results(
        &self,
        submission_id: &str,
        results: Vec<QuestionResult>,
    ) -> Result<(), StoreError>;

    async fn results_for(&self, submission_id: &str) -> Result<Vec<QuestionResult>, StoreError>;

    /// 写入人工覆盖（同一题以最新一条为准），不影响 AI 评分结果
    async fn save_override(
        &self,
        submission_id: &str,
        override_entry: ManualOverride,
    ) -> Result<(), StoreError>;

    async fn overrides_for(&self, submission_id: &str) -> Result<Vec<ManualOverride>, StoreError>;
}

#[derive(Default)]
struct Tables {
    submissions: HashMap<String, Submission>,
    answers: HashMap<String, Vec<ExtractedAnswer>>,
    results: HashMap<String, Vec<QuestionResult>>,
    overrides: HashMap<String, Vec<ManualOverride>>,
}

impl Tables {
    fn ensure_submission(&self, submission_id: &str) -> Result<(), StoreError> {
        if self.submissions.contains_key(submission_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(submission_id.to_string()))
        }
    }
}

/// 进程内记录存储
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_submission(&self, submission: Submission) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.submissions.contains_key(&submission.id) {
            return Err(StoreError::Duplicate(submission.id));
        }
        debug!("写入提交记录: {}", submission.id);
        tables.submissions.insert(submission.id.clone(), submission);
        Ok(())
    }

    async fn get_submission(&self, submission_id: &str) -> Result<Submission, StoreError> {
        self.tables
            .read()
            .await
            .submissions
            .get(submission_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(submission_id.to_string()))
    }

    async fn submissions_for_exam(&self, exam_id: &str) -> Result<Vec<Submission>, StoreError> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(submissions)
    }

    async fn try_begin_grading(&self, submission_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::NotFound(submission_id.to_string()))?;

        if !submission.status.can_begin_grading() {
            debug!(
                "提交 {} 当前状态为 {}，无法获取评分租约",
                submission_id, submission.status
            );
            return Ok(false);
        }

        submission.status = SubmissionStatus::Processing;
        Ok(true)
    }

    async fn finish_grading(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::NotFound(submission_id.to_string()))?;
        submission.status = status;
        Ok(())
    }

    async fn save_answers(
        &self,
        submission_id: &str,
        answers: Vec<ExtractedAnswer>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_submission(submission_id)?;
        tables.answers.insert(submission_id.to_string(), answers);
        Ok(())
    }

    async fn answers_for(&self, submission_id: &str) -> Result<Vec<ExtractedAnswer>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_submission(submission_id)?;
        Ok(tables.answers.get(submission_id).cloned().unwrap_or_default())
    }

    async fn save_results(
        &self,
        submission_id: &str,
        results: Vec<QuestionResult>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_submission(submission_id)?;
        tables.results.insert(submission_id.to_string(), results);
        Ok(())
    }

    async fn results_for(&self, submission_id: &str) -> Result<Vec<QuestionResult>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_submission(submission_id)?;
        Ok(tables.results.get(submission_id).cloned().unwrap_or_default())
    }

    async fn save_override(
        &self,
        submission_id: &str,
        override_entry: ManualOverride,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_submission(submission_id)?;
        let entries = tables
            .overrides
            .entry(submission_id.to_string())
            .or_default();
        entries.retain(|o| o.question_id != override_entry.question_id);
        entries.push(override_entry);
        entries.sort_by_key(|o| o.question_id);
        Ok(())
    }

    async fn overrides_for(&self, submission_id: &str) -> Result<Vec<ManualOverride>, StoreError> {
        let tables = self.tables.read().await;
        tables.ensure_submission(submission_id)?;
        Ok(tables
            .overrides
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }
}
