//! 评分结果数据结构
//!
//! `QuestionResult` 由评分流程产生；`ExamReport` 与 `ClassSummary`
//! 完全由 `QuestionResult` 推导，随时可重算

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 等级
///
/// 声明顺序即从高到低，`Ord` 依赖该顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    /// 全部等级（从高到低）
    pub const ALL: [Grade; 6] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::F,
    ];

    /// 按百分比确定等级，取满足条件的最高档
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 85.0 {
            Grade::APlus
        } else if percentage >= 75.0 {
            Grade::A
        } else if percentage >= 65.0 {
            Grade::BPlus
        } else if percentage >= 55.0 {
            Grade::B
        } else if percentage >= 45.0 {
            Grade::C
        } else {
            Grade::F
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: u32,
    /// 学生作答原文
    pub extracted_answer: String,
    /// 得分，始终位于 [0, max_marks]
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub feedback: String,
    /// 语义相似度；空答案和评分不可用时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// 评分置信度
    pub confidence: f64,
}

impl QuestionResult {
    /// 得分率；满分为 0 时返回 None
    pub fn ratio(&self) -> Option<f64> {
        if self.max_marks > 0.0 {
            Some(self.marks_obtained / self.max_marks)
        } else {
            None
        }
    }
}

/// 人工复核覆盖
///
/// 与 AI 评分结果并存，不修改原结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub question_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 学生是否对该题提出异议
    #[serde(default)]
    pub disputed: bool,
}

/// 单份答卷报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamReport {
    pub submission_id: String,
    pub results: Vec<QuestionResult>,
    pub total_obtained: f64,
    pub total_possible: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub average_confidence: f64,
    /// 总体评语
    pub overall_feedback: String,
}

/// 班级内单个学生的汇总行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentTotal {
    pub student_id: String,
    pub submission_id: String,
    pub total_obtained: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub needs_review: bool,
}

/// 汇总输入：一名学生的报告及其人工覆盖记录
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub student_id: String,
    pub report: ExamReport,
    pub overrides: Vec<ManualOverride>,
}

/// 班级统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub exam_id: String,
    pub exam_max_marks: f64,
    pub students: Vec<StudentTotal>,
    /// 固定六档的等级分布
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub needs_review_count: usize,
    pub average_score: f64,
    pub average_percentage: f64,
}
