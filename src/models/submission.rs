use serde::{Deserialize, Serialize};

/// 提交状态
///
/// 状态字段同时充当评分租约：只有 `Uploaded` / `Failed` 可以进入 `Processing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Uploaded,
    Processing,
    Graded,
    Failed,
}

impl SubmissionStatus {
    /// 是否允许开始一次新的评分
    pub fn can_begin_grading(self) -> bool {
        matches!(self, SubmissionStatus::Uploaded | SubmissionStatus::Failed)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmissionStatus::Uploaded => "uploaded",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Graded => "graded",
            SubmissionStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// 一份学生答卷（OCR 已完成）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    /// 原始文档引用（文件路径等）
    pub source_document: String,
    /// OCR 识别出的整页文本
    pub recognized_text: String,
    pub status: SubmissionStatus,
}

impl Submission {
    pub fn new(
        id: impl Into<String>,
        exam_id: impl Into<String>,
        student_id: impl Into<String>,
        source_document: impl Into<String>,
        recognized_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            exam_id: exam_id.into(),
            student_id: student_id.into(),
            source_document: source_document.into(),
            recognized_text: recognized_text.into(),
            status: SubmissionStatus::Uploaded,
        }
    }
}

/// 切分出的单题作答
///
/// 每个 (提交, 题目) 只产生一条；重新处理时整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    pub question_id: u32,
    /// 作答原文（可能为空）
    pub text: String,
    pub source_document: String,
    /// 抽取置信度，与评分置信度无关
    pub extraction_confidence: f64,
}
