//! 单份答卷处理器 - 编排层
//!
//! ## 核心功能
//!
//! 1. **租约**：通过记录存储的状态字段独占一份答卷
//! 2. **流程调度**：委托 `GradingFlow` 完成切分、评分、汇总
//! 3. **持久化**：整体替换切分结果与评分结果
//! 4. **复核清单**：低置信度题目写入复核文件
//! 5. **收尾**：成功置为 Graded，失败置为 Failed（可重新评分）

use anyhow::Result;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::RecordStore;
use crate::models::{Exam, ExamReport, SubmissionStatus};
use crate::services::aggregator::REVIEW_CONFIDENCE_THRESHOLD;
use crate::services::ReviewWriter;
use crate::workflow::{GradingFlow, SubmissionCtx};

/// 单份答卷的处理结果
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// 评分完成
    Graded {
        student_id: String,
        report: ExamReport,
    },
    /// 其他任务正在评分或已经评分完成
    Skipped,
    /// 评分失败，状态已回到 Failed
    Failed,
}

/// 处理单份答卷
///
/// # 参数
/// - `store`: 记录存储
/// - `flow`: 评分流程
/// - `review_writer`: 复核清单写入器
/// - `exam`: 试卷
/// - `submission_id`: 提交ID
/// - `submission_index`: 答卷索引（用于日志）
pub async fn process_submission(
    store: &dyn RecordStore,
    flow: &GradingFlow,
    review_writer: &ReviewWriter,
    exam: &Exam,
    submission_id: &str,
    submission_index: usize,
) -> Result<SubmissionOutcome> {
    let submission = store.get_submission(submission_id).await?;
    let ctx = SubmissionCtx::new(&submission, submission_index);

    log_submission_start(&ctx);

    // 租约没拿到时不得改动状态，状态可能属于另一个正在评分的任务
    if let Err(e) = acquire_lease(store, &ctx).await {
        if e.is_busy() {
            warn!("[提交 {}] ⏭️ {}，跳过", submission_index, e);
            return Ok(SubmissionOutcome::Skipped);
        }
        error!("[提交 {}] ❌ 评分租约获取失败: {}", submission_index, e);
        return Err(anyhow::Error::new(e)
            .context(format!("无法获取答卷 {} 的评分租约", submission_id)));
    }

    match grade_with_lease(store, flow, review_writer, exam, &ctx).await {
        Ok(report) => {
            store
                .finish_grading(submission_id, SubmissionStatus::Graded)
                .await?;
            info!("[提交 {}] ✅ 答卷评分完成", submission_index);
            Ok(SubmissionOutcome::Graded {
                student_id: ctx.student_id,
                report,
            })
        }
        Err(e) => {
            error!("[提交 {}] ❌ 评分失败: {}", submission_index, e);
            store
                .finish_grading(submission_id, SubmissionStatus::Failed)
                .await?;
            Ok(SubmissionOutcome::Failed)
        }
    }
}

/// 获取评分租约，已被占用时返回 `SubmissionBusy`
async fn acquire_lease(store: &dyn RecordStore, ctx: &SubmissionCtx) -> AppResult<()> {
    if store.try_begin_grading(&ctx.submission_id).await? {
        Ok(())
    } else {
        Err(AppError::submission_busy(&ctx.submission_id))
    }
}

/// 持有租约期间的全部工作
async fn grade_with_lease(
    store: &dyn RecordStore,
    flow: &GradingFlow,
    review_writer: &ReviewWriter,
    exam: &Exam,
    ctx: &SubmissionCtx,
) -> AppResult<ExamReport> {
    let submission = store.get_submission(&ctx.submission_id).await?;
    let graded = flow.run(exam, &submission, ctx).await?;

    store
        .save_answers(&ctx.submission_id, graded.answers)
        .await?;
    store
        .save_results(&ctx.submission_id, graded.report.results.clone())
        .await?;

    write_review_entries(review_writer, &graded.report, ctx).await;

    Ok(graded.report)
}

/// 写入复核清单，写入失败不影响评分结果
async fn write_review_entries(review_writer: &ReviewWriter, report: &ExamReport, ctx: &SubmissionCtx) {
    let flagged: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.confidence < REVIEW_CONFIDENCE_THRESHOLD)
        .collect();

    if flagged.is_empty() {
        return;
    }

    for result in &flagged {
        if let Err(e) = review_writer.write(&ctx.submission_id, result).await {
            warn!(
                "[提交 {}] ⚠️ 写入 {} 失败 (题目 {}): {}",
                ctx.submission_index,
                review_writer.path(),
                result.question_id,
                e
            );
        }
    }

    warn!(
        "[提交 {}] ⚠️ {} 道题置信度低于 {}，已写入 {}",
        ctx.submission_index,
        flagged.len(),
        REVIEW_CONFIDENCE_THRESHOLD,
        review_writer.path()
    );
}

// ========== 日志辅助函数 ==========

fn log_submission_start(ctx: &SubmissionCtx) {
    info!("[提交 {}] 开始评分 {}", ctx.submission_index, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{MemoryRecordStore, StoreError};
    use crate::models::{ExtractedAnswer, ManualOverride, QuestionResult, QuestionSpec, Submission};
    use crate::services::similarity::test_support::{StalledEmbedder, TableEmbedder};
    use crate::services::{MarkingEngine, SimilarityScorer};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    fn exam() -> Exam {
        Exam {
            id: "geo".to_string(),
            title: "Geography".to_string(),
            subject: "geography".to_string(),
            questions: vec![
                QuestionSpec::new(1, 4.0).with_model_answer("Water evaporates and condenses"),
                QuestionSpec::new(2, 6.0).with_model_answer("Tectonic plates move"),
            ],
            file_path: None,
        }
    }

    fn review_writer(name: &str) -> ReviewWriter {
        let path = std::env::temp_dir().join(format!(
            "answer_grader_{}_{}.txt",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        ReviewWriter::with_path(path.to_string_lossy().to_string())
    }

    async fn store_with(text: &str) -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        store
            .insert_submission(Submission::new("geo-dan", "geo", "dan", "dan.txt", text))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_process_submission_saves_and_marks_graded() {
        let embedder = TableEmbedder::new()
            .with_pair("Water evaporates and condenses", "Evaporation then condensation", 0.8)
            .with_pair("Tectonic plates move", "Plates shift", 0.4);
        let flow = GradingFlow::new(MarkingEngine::new(SimilarityScorer::new(
            Arc::new(embedder),
            Duration::from_secs(5),
        )));
        let store = store_with("1.\nEvaporation then condensation\n2.\nPlates shift").await;
        let writer = review_writer("processor_review");

        let outcome = process_submission(&store, &flow, &writer, &exam(), "geo-dan", 1)
            .await
            .unwrap();

        let SubmissionOutcome::Graded { student_id, report } = outcome else {
            panic!("应当评分完成");
        };
        assert_eq!(student_id, "dan");
        assert_eq!(report.results.len(), 2);

        let saved = store.get_submission("geo-dan").await.unwrap();
        assert_eq!(saved.status, SubmissionStatus::Graded);
        assert_eq!(store.answers_for("geo-dan").await.unwrap().len(), 2);
        assert_eq!(store.results_for("geo-dan").await.unwrap(), report.results);

        // 第二题置信度 0.5，进入复核清单
        let review = tokio::fs::read_to_string(writer.path()).await.unwrap();
        assert_eq!(review.lines().count(), 1);
        assert!(review.contains("题目 2"));
        tokio::fs::remove_file(writer.path()).await.unwrap();

        // 已评分的答卷不会被再次评分
        let again = process_submission(&store, &flow, &writer, &exam(), "geo-dan", 1)
            .await
            .unwrap();
        assert!(matches!(again, SubmissionOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_process_submission_degrades_when_embedder_stalls() {
        let flow = GradingFlow::new(MarkingEngine::new(SimilarityScorer::new(
            Arc::new(StalledEmbedder),
            Duration::from_millis(50),
        )));
        let store = store_with("1.\nSomething\n").await;
        let writer = review_writer("processor_stalled");

        let outcome = process_submission(&store, &flow, &writer, &exam(), "geo-dan", 2)
            .await
            .unwrap();

        let SubmissionOutcome::Graded { report, .. } = outcome else {
            panic!("降级结果仍应评分完成");
        };
        assert_eq!(report.results[0].feedback, "Grading unavailable");
        assert_eq!(report.results[0].confidence, 0.1);
        assert_eq!(report.results[1].feedback, "No answer provided");
        let _ = tokio::fs::remove_file(writer.path()).await;
    }

    #[tokio::test]
    async fn test_process_submission_marks_failed_on_exam_mismatch() {
        let flow = GradingFlow::new(MarkingEngine::new(SimilarityScorer::new(
            Arc::new(TableEmbedder::new()),
            Duration::from_secs(5),
        )));
        let store = store_with("1.\nanything").await;
        let writer = review_writer("processor_mismatch");
        let mut other = exam();
        other.id = "history".to_string();

        let outcome = process_submission(&store, &flow, &writer, &other, "geo-dan", 1)
            .await
            .unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Failed));

        let saved = store.get_submission("geo-dan").await.unwrap();
        assert_eq!(saved.status, SubmissionStatus::Failed);

        // Failed 允许重新评分
        let retry = process_submission(&store, &flow, &writer, &exam(), "geo-dan", 1).await;
        assert!(matches!(retry, Ok(SubmissionOutcome::Graded { .. })));
        let _ = tokio::fs::remove_file(writer.path()).await;
    }

    /// 租约接口总是报错的存储，其余操作交给内存实现
    struct FlakyLeaseStore {
        inner: MemoryRecordStore,
    }

    #[async_trait]
    impl RecordStore for FlakyLeaseStore {
        async fn insert_submission(&self, submission: Submission) -> Result<(), StoreError> {
            self.inner.insert_submission(submission).await
        }

        async fn get_submission(&self, submission_id: &str) -> Result<Submission, StoreError> {
            self.inner.get_submission(submission_id).await
        }

        async fn submissions_for_exam(&self, exam_id: &str) -> Result<Vec<Submission>, StoreError> {
            self.inner.submissions_for_exam(exam_id).await
        }

        async fn try_begin_grading(&self, _submission_id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Backend("连接中断".to_string()))
        }

        async fn finish_grading(
            &self,
            submission_id: &str,
            status: SubmissionStatus,
        ) -> Result<(), StoreError> {
            self.inner.finish_grading(submission_id, status).await
        }

        async fn save_answers(
            &self,
            submission_id: &str,
            answers: Vec<ExtractedAnswer>,
        ) -> Result<(), StoreError> {
            self.inner.save_answers(submission_id, answers).await
        }

        async fn answers_for(&self, submission_id: &str) -> Result<Vec<ExtractedAnswer>, StoreError> {
            self.inner.answers_for(submission_id).await
        }

        async fn save_results(
            &self,
            submission_id: &str,
            results: Vec<QuestionResult>,
        ) -> Result<(), StoreError> {
            self.inner.save_results(submission_id, results).await
        }

        async fn results_for(&self, submission_id: &str) -> Result<Vec<QuestionResult>, StoreError> {
            self.inner.results_for(submission_id).await
        }

        async fn save_override(
            &self,
            submission_id: &str,
            override_entry: ManualOverride,
        ) -> Result<(), StoreError> {
            self.inner.save_override(submission_id, override_entry).await
        }

        async fn overrides_for(&self, submission_id: &str) -> Result<Vec<ManualOverride>, StoreError> {
            self.inner.overrides_for(submission_id).await
        }
    }

    #[tokio::test]
    async fn test_lease_error_leaves_status_untouched() {
        let inner = store_with("1.\nEvaporation").await;
        // 另一个任务已经持有租约
        assert!(inner.try_begin_grading("geo-dan").await.unwrap());
        let store = FlakyLeaseStore { inner };

        let flow = GradingFlow::new(MarkingEngine::new(SimilarityScorer::new(
            Arc::new(TableEmbedder::new()),
            Duration::from_secs(5),
        )));
        let writer = review_writer("processor_lease_error");

        let result = process_submission(&store, &flow, &writer, &exam(), "geo-dan", 1).await;
        assert!(result.is_err());

        let saved = store.get_submission("geo-dan").await.unwrap();
        assert_eq!(saved.status, SubmissionStatus::Processing);
        assert!(store.results_for("geo-dan").await.unwrap().is_empty());
        assert!(!std::path::Path::new(writer.path()).exists());
    }

    #[tokio::test]
    async fn test_missing_submission_is_an_error() {
        let flow = GradingFlow::new(MarkingEngine::new(SimilarityScorer::new(
            Arc::new(TableEmbedder::new()),
            Duration::from_secs(5),
        )));
        let store = MemoryRecordStore::new();
        let writer = review_writer("processor_missing");

        let result = process_submission(&store, &flow, &writer, &exam(), "nobody", 1).await;
        assert!(result.is_err());
    }
}
