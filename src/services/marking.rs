//! 评分策略服务 - 业务能力层
//!
//! 只负责"一道题怎么给分"，不关心流程
//!
//! 策略按固定顺序执行：
//! 1. 空作答 → 0 分，置信度 1.0（终止）
//! 2. 计算语义相似度
//! 3. 按相似度分档得到基础得分率
//! 4. 有关键词时按 0.7 / 0.3 混合关键词覆盖率
//! 5. 题型覆盖：数值题按相对误差、选择题按相似度阈值
//! 6. 得分 = 满分 × 得分率（保留两位小数），置信度 = clamp(相似度 + 0.1, 0.1, 0.9)

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::{QuestionResult, QuestionSpec, QuestionType};
use crate::services::similarity::SimilarityScorer;

pub const NO_ANSWER_FEEDBACK: &str = "No answer provided";
pub const UNAVAILABLE_FEEDBACK: &str = "Grading unavailable";

/// 相似度分档（下限, 得分率, 评语），从高到低匹配
const SIMILARITY_BANDS: [(f64, f64, &str); 4] = [
    (0.90, 1.00, "Excellent answer"),
    (0.70, 0.80, "Good answer with minor gaps"),
    (0.50, 0.60, "Partial answer, missing key points"),
    (0.30, 0.40, "Basic understanding shown, needs improvement"),
];
const FLOOR_BAND: (f64, &str) = (0.20, "Answer needs significant improvement");

const SIMILARITY_WEIGHT: f64 = 0.7;
const KEYWORD_WEIGHT: f64 = 0.3;

const MCQ_THRESHOLD: f64 = 0.8;

const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.9;
const CONFIDENCE_BOOST: f64 = 0.1;

/// 评分不可用时的固定置信度
const UNAVAILABLE_CONFIDENCE: f64 = MIN_CONFIDENCE;

/// 数值：可选负号、数字、可选小数点和小数部分（不支持科学计数法和千分位）
static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+\.?\d*").expect("数值正则无效"));

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 相似度 → (基础得分率, 评语)
pub fn similarity_band(similarity: f64) -> (f64, &'static str) {
    SIMILARITY_BANDS
        .iter()
        .find(|(min, _, _)| similarity >= *min)
        .map(|(_, ratio, feedback)| (*ratio, *feedback))
        .unwrap_or(FLOOR_BAND)
}

/// 关键词覆盖率（忽略大小写的子串包含）
pub fn keyword_coverage(answer: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let answer_lower = answer.to_lowercase();
    let found = keywords
        .iter()
        .filter(|k| answer_lower.contains(&k.to_lowercase()))
        .count();
    found as f64 / keywords.len() as f64
}

fn keyword_qualifier(coverage: f64) -> &'static str {
    if coverage > 0.8 {
        "Contains most key terms"
    } else if coverage > 0.5 {
        "Contains some key terms"
    } else {
        "Missing important key terms"
    }
}

/// 提取文本中的全部数值
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// 数值题得分率
///
/// 取双方最后一个数值比较相对误差；任一方没有数值时沿用 `base_ratio`
pub fn numerical_ratio(student_answer: &str, model_answer: &str, base_ratio: f64) -> f64 {
    let (Some(student), Some(model)) = (
        extract_numbers(student_answer).last().copied(),
        extract_numbers(model_answer).last().copied(),
    ) else {
        debug!("数值题未提取到可比较的数值，沿用基础得分率 {:.2}", base_ratio);
        return base_ratio;
    };

    if model == 0.0 {
        return if student == model { 1.0 } else { 0.0 };
    }

    let relative_error = (student - model).abs() / model.abs();
    if !relative_error.is_finite() {
        return base_ratio;
    }

    debug!(
        "数值比较: 学生 {} / 参考 {} / 相对误差 {:.4}",
        student, model, relative_error
    );

    if relative_error <= 0.01 {
        1.0
    } else if relative_error <= 0.05 {
        0.9
    } else if relative_error <= 0.10 {
        0.7
    } else {
        0.3
    }
}

fn confidence_for(similarity: f64) -> f64 {
    round2((similarity + CONFIDENCE_BOOST).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
}

fn effective_max_marks(question: &QuestionSpec) -> f64 {
    if question.max_marks.is_finite() && question.max_marks > 0.0 {
        question.max_marks
    } else {
        warn!(
            "题目 {} 的满分无效 ({})，按 0 分处理",
            question.id, question.max_marks
        );
        0.0
    }
}

fn marks_for(max_marks: f64, ratio: f64) -> f64 {
    round2(max_marks * ratio.clamp(0.0, 1.0)).clamp(0.0, max_marks)
}

/// 空作答结果
pub fn no_answer_result(question: &QuestionSpec, student_answer: &str) -> QuestionResult {
    QuestionResult {
        question_id: question.id,
        extracted_answer: student_answer.to_string(),
        marks_obtained: 0.0,
        max_marks: effective_max_marks(question),
        feedback: NO_ANSWER_FEEDBACK.to_string(),
        similarity: None,
        confidence: 1.0,
    }
}

/// embedding 不可用时的降级结果
pub fn unavailable_result(question: &QuestionSpec, student_answer: &str) -> QuestionResult {
    QuestionResult {
        question_id: question.id,
        extracted_answer: student_answer.to_string(),
        marks_obtained: 0.0,
        max_marks: effective_max_marks(question),
        feedback: UNAVAILABLE_FEEDBACK.to_string(),
        similarity: None,
        confidence: UNAVAILABLE_CONFIDENCE,
    }
}

/// 在已知相似度的前提下执行第 1、3–6 步
///
/// 纯函数，便于脱离 embedding 单独验证策略
pub fn mark(question: &QuestionSpec, student_answer: &str, similarity: f64) -> QuestionResult {
    if student_answer.trim().is_empty() {
        return no_answer_result(question, student_answer);
    }

    if !similarity.is_finite() {
        warn!("题目 {} 的相似度无效 ({})，按不可评分处理", question.id, similarity);
        return unavailable_result(question, student_answer);
    }

    let (mut ratio, base_feedback) = similarity_band(similarity);
    let mut feedback = base_feedback.to_string();

    if !question.keywords.is_empty() {
        let coverage = keyword_coverage(student_answer, &question.keywords);
        ratio = ratio * SIMILARITY_WEIGHT + coverage * KEYWORD_WEIGHT;
        feedback = format!("{} - {}", feedback, keyword_qualifier(coverage));
    }

    match question.effective_type() {
        QuestionType::Numerical => {
            let model_answer = question.model_answer.as_deref().unwrap_or_default();
            ratio = numerical_ratio(student_answer, model_answer, ratio);
        }
        QuestionType::Mcq => {
            let correct = similarity > MCQ_THRESHOLD;
            ratio = if correct { 1.0 } else { 0.0 };
            feedback = if correct { "Correct" } else { "Incorrect" }.to_string();
        }
        QuestionType::Descriptive => {}
    }

    let max_marks = effective_max_marks(question);

    QuestionResult {
        question_id: question.id,
        extracted_answer: student_answer.to_string(),
        marks_obtained: marks_for(max_marks, ratio),
        max_marks,
        feedback,
        similarity: Some(similarity),
        confidence: confidence_for(similarity),
    }
}

/// 评分引擎
///
/// 职责：
/// - 对单道题目按固定策略打分
/// - embedding 失败或超时时降级为低置信度 0 分，不向上抛错
/// - 不出现 submission_id，不关心流程顺序
#[derive(Clone)]
pub struct MarkingEngine {
    scorer: SimilarityScorer,
}

impl MarkingEngine {
    pub fn new(scorer: SimilarityScorer) -> Self {
        Self { scorer }
    }

    /// 对一道题评分
    pub async fn score(&self, question: &QuestionSpec, student_answer: &str) -> QuestionResult {
        if student_answer.trim().is_empty() {
            return no_answer_result(question, student_answer);
        }

        let model_answer = question.model_answer.as_deref().unwrap_or_default();
        if model_answer.trim().is_empty() {
            warn!("题目 {} 没有参考答案，相似度按 0 处理", question.id);
            return mark(question, student_answer, 0.0);
        }

        match self.scorer.similarity(model_answer, student_answer).await {
            Ok(similarity) => {
                let result = mark(question, student_answer, similarity);
                debug!(
                    "题目 {} 评分完成: {}/{} (相似度 {:.2}, 置信度 {:.2})",
                    question.id,
                    result.marks_obtained,
                    result.max_marks,
                    similarity,
                    result.confidence
                );
                result
            }
            Err(e) => {
                warn!("题目 {} 相似度计算失败，降级为不可评分: {}", question.id, e);
                unavailable_result(question, student_answer)
            }
        }
    }
}
