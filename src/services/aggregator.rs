//! 汇总服务 - 业务能力层
//!
//! 纯数据进、纯数据出：
//! - `aggregate`：单份答卷报告（总分、百分比、等级、平均置信度）
//! - `narrate`：总体评语
//! - `summarize`：班级统计（等级分布、复核人数）
//! - `apply_overrides`：叠加人工复核后的有效结果

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    ClassSummary, ExamReport, Grade, ManualOverride, QuestionResult, StudentRecord, StudentTotal,
};
use crate::services::marking::round2;

/// 置信度低于该值的结果需要人工复核
pub const REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// 得分率低于该值的题目列入"重点改进"
const WEAK_QUESTION_RATIO: f64 = 0.6;
const MAX_FOCUS_QUESTIONS: usize = 3;

/// 总体评语分档（下限, 标签, 评语）
const NARRATIVE_BANDS: [(f64, &str, &str); 5] = [
    (
        90.0,
        "Excellent",
        "Outstanding performance! You have demonstrated comprehensive understanding.",
    ),
    (
        80.0,
        "Very Good",
        "Very good work! Minor areas for improvement identified.",
    ),
    (
        70.0,
        "Good",
        "Good performance with some areas needing attention.",
    ),
    (
        60.0,
        "Satisfactory",
        "Satisfactory work, but significant improvement needed in several areas.",
    ),
    (
        50.0,
        "Pass",
        "Basic understanding shown, but major gaps need to be addressed.",
    ),
];
const NARRATIVE_FLOOR: (&str, &str) = (
    "Needs Improvement",
    "Significant study and practice required to improve performance.",
);

/// 百分比，总分为 0 时返回 0
pub fn percentage(obtained: f64, possible: f64) -> f64 {
    if possible > 0.0 {
        round2(100.0 * obtained / possible)
    } else {
        0.0
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

/// 生成单份答卷报告
pub fn aggregate(submission_id: &str, results: Vec<QuestionResult>) -> ExamReport {
    let total_obtained = round2(results.iter().map(|r| r.marks_obtained).sum());
    let total_possible = round2(results.iter().map(|r| r.max_marks).sum());
    let percentage = percentage(total_obtained, total_possible);
    let average_confidence = round2(mean(results.iter().map(|r| r.confidence)));
    let overall_feedback = narrate(&results, percentage);

    ExamReport {
        submission_id: submission_id.to_string(),
        results,
        total_obtained,
        total_possible,
        percentage,
        grade: Grade::from_percentage(percentage),
        average_confidence,
        overall_feedback,
    }
}

/// 生成总体评语
///
/// 末尾按原题目顺序列出前三道得分率低于 60% 的题目；没有则省略
pub fn narrate(results: &[QuestionResult], percentage: f64) -> String {
    let (label, sentence) = NARRATIVE_BANDS
        .iter()
        .find(|(min, _, _)| percentage >= *min)
        .map(|(_, label, sentence)| (*label, *sentence))
        .unwrap_or(NARRATIVE_FLOOR);

    let mut feedback = sentence.to_string();

    let weak: Vec<String> = results
        .iter()
        .filter(|r| r.ratio().is_some_and(|ratio| ratio < WEAK_QUESTION_RATIO))
        .take(MAX_FOCUS_QUESTIONS)
        .map(|r| r.question_id.to_string())
        .collect();

    if !weak.is_empty() {
        feedback.push_str(&format!(" Focus on improving questions {}.", weak.join(", ")));
    }

    format!("{}: {}", label, feedback)
}

/// 叠加人工复核
///
/// 返回新的结果列表，原始 AI 结果不变；覆盖分数截断到 [0, 满分]
pub fn apply_overrides(
    results: &[QuestionResult],
    overrides: &[ManualOverride],
) -> Vec<QuestionResult> {
    let by_question: HashMap<u32, &ManualOverride> =
        overrides.iter().map(|o| (o.question_id, o)).collect();

    results
        .iter()
        .map(|result| {
            let mut effective = result.clone();
            if let Some(entry) = by_question.get(&result.question_id) {
                if let Some(marks) = entry.marks {
                    effective.marks_obtained = round2(marks.clamp(0.0, result.max_marks.max(0.0)));
                }
                if let Some(note) = &entry.note {
                    effective.feedback = note.clone();
                }
            }
            effective
        })
        .collect()
}

/// 是否需要人工复核：任一题置信度低于阈值，或有异议
pub fn needs_review(report: &ExamReport, overrides: &[ManualOverride]) -> bool {
    let disputed: HashSet<u32> = overrides
        .iter()
        .filter(|o| o.disputed)
        .map(|o| o.question_id)
        .collect();

    report
        .results
        .iter()
        .any(|r| r.confidence < REVIEW_CONFIDENCE_THRESHOLD || disputed.contains(&r.question_id))
}

/// 生成班级统计
pub fn summarize(exam_id: &str, records: &[StudentRecord], exam_max_marks: f64) -> ClassSummary {
    let mut grade_distribution: BTreeMap<Grade, usize> =
        Grade::ALL.iter().map(|grade| (*grade, 0)).collect();

    let students: Vec<StudentTotal> = records
        .iter()
        .map(|record| {
            let report = &record.report;
            *grade_distribution.entry(report.grade).or_insert(0) += 1;
            StudentTotal {
                student_id: record.student_id.clone(),
                submission_id: report.submission_id.clone(),
                total_obtained: report.total_obtained,
                percentage: report.percentage,
                grade: report.grade,
                needs_review: needs_review(report, &record.overrides),
            }
        })
        .collect();

    let needs_review_count = students.iter().filter(|s| s.needs_review).count();
    // 百分比用未取整的平均分计算，避免两次取整
    let raw_average = mean(students.iter().map(|s| s.total_obtained));

    ClassSummary {
        exam_id: exam_id.to_string(),
        exam_max_marks,
        grade_distribution,
        needs_review_count,
        average_score: round2(raw_average),
        average_percentage: percentage(raw_average, exam_max_marks),
        students,
    }
}
