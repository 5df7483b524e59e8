//! 答卷评分流程 - 流程层
//!
//! 核心职责：定义"一份答卷"的完整评分流程
//!
//! 流程顺序：
//! 1. 按题号切分识别文本
//! 2. 各题并行评分
//! 3. 汇总为答卷报告

use futures::future::join_all;
use std::collections::HashMap;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{Exam, ExamReport, ExtractedAnswer, Submission};
use crate::services::{aggregator, segmenter, MarkingEngine};
use crate::utils::logging::truncate_text;
use crate::workflow::submission_ctx::SubmissionCtx;

/// 一份答卷的评分产物
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub answers: Vec<ExtractedAnswer>,
    pub report: ExamReport,
}

/// 答卷评分流程
///
/// - 编排 切分 → 评分 → 汇总
/// - 不持有存储，不关心租约
/// - 只依赖业务能力（services）
#[derive(Clone)]
pub struct GradingFlow {
    engine: MarkingEngine,
    verbose_logging: bool,
}

impl GradingFlow {
    pub fn new(engine: MarkingEngine) -> Self {
        Self {
            engine,
            verbose_logging: false,
        }
    }

    pub fn with_verbose(mut self, verbose_logging: bool) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    pub async fn run(
        &self,
        exam: &Exam,
        submission: &Submission,
        ctx: &SubmissionCtx,
    ) -> AppResult<GradedSubmission> {
        if submission.exam_id != exam.id {
            return Err(AppError::exam_mismatch(
                &submission.id,
                &exam.id,
                &submission.exam_id,
            ));
        }

        // ========== 步骤 1: 切分 ==========
        let answers = segmenter::extract_answers(submission, &exam.questions);
        let found = answers
            .iter()
            .filter(|a| a.extraction_confidence > 0.0)
            .count();
        info!(
            "[提交 {}] ✂️ 切分完成，找到 {}/{} 道题的作答",
            ctx.submission_index,
            found,
            exam.questions.len()
        );

        // ========== 步骤 2: 并行评分 ==========
        let by_question: HashMap<u32, &str> = answers
            .iter()
            .map(|a| (a.question_id, a.text.as_str()))
            .collect();

        let results = join_all(exam.questions.iter().map(|question| {
            let text = by_question.get(&question.id).copied().unwrap_or_default();
            self.engine.score(question, text)
        }))
        .await;

        if self.verbose_logging {
            for result in &results {
                info!(
                    "[提交 {}]   题目 {}: {}/{} (置信度 {:.2}) 作答: {}",
                    ctx.submission_index,
                    result.question_id,
                    result.marks_obtained,
                    result.max_marks,
                    result.confidence,
                    truncate_text(&result.extracted_answer, 40)
                );
            }
        }

        // ========== 步骤 3: 汇总 ==========
        let report = aggregator::aggregate(&submission.id, results);
        info!(
            "[提交 {}] 📊 总分 {}/{} ({}%) 等级 {}",
            ctx.submission_index,
            report.total_obtained,
            report.total_possible,
            report.percentage,
            report.grade
        );

        Ok(GradedSubmission { answers, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, QuestionSpec, QuestionType};
    use crate::services::similarity::test_support::TableEmbedder;
    use crate::services::SimilarityScorer;
    use std::sync::Arc;
    use std::time::Duration;

    fn exam() -> Exam {
        Exam {
            id: "bio".to_string(),
            title: "Biology quiz".to_string(),
            subject: "biology".to_string(),
            questions: vec![
                QuestionSpec::new(1, 10.0).with_model_answer("Plants convert light into food"),
                QuestionSpec::new(2, 5.0)
                    .with_model_answer("42")
                    .with_type(QuestionType::Numerical),
                QuestionSpec::new(3, 5.0).with_model_answer("Mitochondria"),
            ],
            file_path: None,
        }
    }

    fn flow(embedder: TableEmbedder) -> (GradingFlow, Arc<TableEmbedder>) {
        let embedder = Arc::new(embedder);
        let scorer = SimilarityScorer::new(embedder.clone(), Duration::from_secs(5));
        (GradingFlow::new(MarkingEngine::new(scorer)), embedder)
    }

    #[tokio::test]
    async fn test_run_grades_every_question_in_order() {
        let (flow, _) = flow(
            TableEmbedder::new()
                .with_pair("Plants convert light into food", "Plants use light to make food", 0.95)
                .with_pair("42", "The answer is 42", 0.5),
        );
        let submission = Submission::new(
            "bio-alice",
            "bio",
            "alice",
            "alice.txt",
            "Name: Alice\n1.\nPlants use light to make food\n2)\nThe answer is 42\n",
        );
        let ctx = SubmissionCtx::new(&submission, 1);

        let graded = flow.run(&exam(), &submission, &ctx).await.unwrap();
        let ids: Vec<u32> = graded.report.results.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(graded.answers.len(), 3);
        assert_eq!(graded.answers[2].extraction_confidence, 0.0);

        let results = &graded.report.results;
        assert_eq!(results[0].marks_obtained, 10.0);
        assert_eq!(results[1].marks_obtained, 5.0);
        assert_eq!(results[2].marks_obtained, 0.0);
        assert_eq!(results[2].confidence, 1.0);

        assert_eq!(graded.report.total_obtained, 15.0);
        assert_eq!(graded.report.total_possible, 20.0);
        assert_eq!(graded.report.percentage, 75.0);
        assert_eq!(graded.report.grade, Grade::A);
    }

    #[tokio::test]
    async fn test_run_rejects_other_exam() {
        let (flow, embedder) = flow(TableEmbedder::new());
        let submission = Submission::new("chem-bob", "chem", "bob", "bob.txt", "1. x");
        let ctx = SubmissionCtx::new(&submission, 1);

        let err = flow.run(&exam(), &submission, &ctx).await.unwrap_err();
        assert!(matches!(err, AppError::Business(_)));
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_blank_sheet() {
        let (flow, embedder) = flow(TableEmbedder::new());
        let submission = Submission::new("bio-carol", "bio", "carol", "carol.txt", "");
        let ctx = SubmissionCtx::new(&submission, 3);

        let graded = flow.with_verbose(true).run(&exam(), &submission, &ctx).await.unwrap();
        assert_eq!(graded.report.total_obtained, 0.0);
        assert_eq!(graded.report.grade, Grade::F);
        assert!(graded.report.results.iter().all(|r| r.confidence == 1.0));
        assert_eq!(embedder.call_count(), 0);
    }
}
