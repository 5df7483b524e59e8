//! 答卷处理上下文
//!
//! 封装"我正在处理第几份答卷、是谁的答卷"这一信息

use std::fmt::Display;

use crate::models::Submission;

/// 答卷处理上下文
#[derive(Debug, Clone)]
pub struct SubmissionCtx {
    /// 提交ID
    pub submission_id: String,

    /// 答卷索引（仅用于日志显示，从1开始）
    pub submission_index: usize,

    /// 学生ID
    pub student_id: String,

    /// 试卷ID
    pub exam_id: String,
}

impl SubmissionCtx {
    pub fn new(submission: &Submission, submission_index: usize) -> Self {
        Self {
            submission_id: submission.id.clone(),
            submission_index,
            student_id: submission.student_id.clone(),
            exam_id: submission.exam_id.clone(),
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[提交 ID#{} 学生#{} 试卷#{}]",
            self.submission_id, self.student_id, self.exam_id
        )
    }
}
