//! 批量答卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责整场考试的批量评分和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、加载试卷、创建 embedding 客户端
//! 2. **批量加载**：扫描答卷目录，把每份答卷登记到记录存储
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将答卷分批次处理，每批完成后再开始下一批
//! 5. **报告输出**：每份答卷一个 JSON 报告，外加 `class_summary.json`
//! 6. **全局统计**：汇总所有答卷的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单份答卷的细节
//! - **资源所有者**：唯一持有记录存储和 embedding 客户端的模块
//! - **向下委托**：委托 submission_processor 处理单份答卷

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{Embedder, MemoryRecordStore, OpenAiEmbedder, RecordStore};
use crate::models::{self, ClassSummary, Exam, ExamReport, StudentRecord, Submission};
use crate::orchestrator::submission_processor::{self, SubmissionOutcome};
use crate::services::{aggregator, MarkingEngine, ReviewWriter, SimilarityScorer};
use crate::utils::logging::{init_log_file, log_batch_start, log_run_plan, RunStats};
use crate::workflow::GradingFlow;

pub const CLASS_SUMMARY_FILE: &str = "class_summary.json";

/// 应用主结构
pub struct App {
    config: Config,
    exam: Arc<Exam>,
    store: Arc<dyn RecordStore>,
    flow: Arc<GradingFlow>,
    review_writer: Arc<ReviewWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        if config.embedding_api_key.is_empty() {
            return Err(AppError::config_missing("EMBEDDING_API_KEY").into());
        }

        let exam = models::load_exam(Path::new(&config.exam_file)).await?;
        info!(
            "✓ 试卷加载完成: {} ({}), 共 {} 道题, 满分 {}",
            exam.title,
            exam.id,
            exam.questions.len(),
            exam.max_marks()
        );
        init_log_file(&config.output_log_file, &exam)?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(&config));

        Ok(Self::new(
            config,
            exam,
            Arc::new(MemoryRecordStore::new()),
            embedder,
        ))
    }

    /// 使用给定的协作者组装应用
    pub fn new(
        config: Config,
        exam: Exam,
        store: Arc<dyn RecordStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let scorer = SimilarityScorer::new(embedder, config.embedding_timeout());
        let flow = GradingFlow::new(MarkingEngine::new(scorer)).with_verbose(config.verbose_logging);
        let review_writer = ReviewWriter::with_path(config.review_file.clone());

        Self {
            config,
            exam: Arc::new(exam),
            store,
            flow: Arc::new(flow),
            review_writer: Arc::new(review_writer),
        }
    }

    /// 运行应用主逻辑
    ///
    /// 返回班级统计；没有答卷时返回 None
    pub async fn run(&self) -> Result<Option<ClassSummary>> {
        let submission_ids = self.register_submissions().await?;

        if submission_ids.is_empty() {
            warn!("⚠️ 没有找到待评分的答卷，程序结束");
            return Ok(None);
        }

        let total = submission_ids.len();
        log_run_plan(&self.config.exam_file, total, self.config.max_concurrent_submissions);

        let (stats, graded) = self.process_all_submissions(submission_ids).await?;

        let summary = self.write_outputs(&graded).await?;

        stats.log_summary(&self.config.output_log_file);

        Ok(Some(summary))
    }

    /// 加载答卷并登记到记录存储
    async fn register_submissions(&self) -> Result<Vec<String>> {
        info!("\n📁 正在扫描待评分的答卷...");
        let submissions: Vec<Submission> =
            models::load_all_answer_files(&self.config.answers_folder, &self.exam.id).await?;

        for submission in submissions {
            let id = submission.id.clone();
            if let Err(e) = self.store.insert_submission(submission).await {
                warn!("⚠️ 答卷 {} 登记失败，跳过: {}", id, e);
            }
        }

        // 以存储中的登记结果为准，包括此前已登记过的答卷
        let ids = self
            .store
            .submissions_for_exam(&self.exam.id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        Ok(ids)
    }

    /// 处理所有答卷
    async fn process_all_submissions(
        &self,
        submission_ids: Vec<String>,
    ) -> Result<(RunStats, Vec<(String, ExamReport)>)> {
        let max_concurrent = self.config.max_concurrent_submissions.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = submission_ids.len();
        let mut stats = RunStats::new(total);
        let mut graded = Vec::new();

        // 分批处理
        for batch_start in (0..total).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total);
            let batch_num = (batch_start / max_concurrent) + 1;
            let total_batches = total.div_ceil(max_concurrent);

            log_batch_start(batch_num, total_batches, batch_start + 1, batch_end);

            let batch_result = self
                .process_batch(&submission_ids[batch_start..batch_end], batch_start, semaphore.clone())
                .await?;

            stats.add_batch(
                batch_num,
                batch_result.graded.len(),
                batch_result.skipped,
                batch_result.failed,
            );

            graded.extend(batch_result.graded);
        }

        Ok((stats, graded))
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_ids: &[String],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        for (idx, submission_id) in batch_ids.iter().enumerate() {
            let submission_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let store = self.store.clone();
            let flow = self.flow.clone();
            let review_writer = self.review_writer.clone();
            let exam = self.exam.clone();
            let submission_id = submission_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                submission_processor::process_submission(
                    store.as_ref(),
                    &flow,
                    &review_writer,
                    &exam,
                    &submission_id,
                    submission_index,
                )
                .await
            });
            batch_handles.push((submission_index, handle));
        }

        // 等待本批所有任务完成
        let mut result = BatchResult::default();

        for (submission_index, handle) in batch_handles {
            match handle.await {
                Ok(Ok(SubmissionOutcome::Graded { student_id, report })) => {
                    result.graded.push((student_id, report));
                }
                Ok(Ok(SubmissionOutcome::Skipped)) => {
                    result.skipped += 1;
                }
                Ok(Ok(SubmissionOutcome::Failed)) => {
                    result.failed += 1;
                }
                Ok(Err(e)) => {
                    error!("[提交 {}] ❌ 处理过程中发生错误: {}", submission_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[提交 {}] 任务执行失败: {}", submission_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }

    /// 写出每份答卷的报告和班级统计
    async fn write_outputs(&self, graded: &[(String, ExamReport)]) -> Result<ClassSummary> {
        let output_dir = PathBuf::from(&self.config.output_folder);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {}", output_dir.display()))?;

        let mut records = Vec::with_capacity(graded.len());
        for (student_id, report) in graded {
            let path = output_dir.join(format!("{}.json", report.submission_id));
            write_json(&path, report).await?;

            let overrides = self.store.overrides_for(&report.submission_id).await?;
            records.push(StudentRecord {
                student_id: student_id.clone(),
                report: report.clone(),
                overrides,
            });
        }

        let summary = aggregator::summarize(&self.exam.id, &records, self.exam.max_marks());
        write_json(&output_dir.join(CLASS_SUMMARY_FILE), &summary).await?;

        info!(
            "📄 已写出 {} 份报告和 {}，需复核 {} 人",
            records.len(),
            CLASS_SUMMARY_FILE,
            summary.needs_review_count
        );

        Ok(summary)
    }
}

/// 以格式化 JSON 写入文件
async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    graded: Vec<(String, ExamReport)>,
    skipped: usize,
    failed: usize,
}
