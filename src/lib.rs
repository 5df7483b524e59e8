//! # Answer Grader
//!
//! 对 OCR 识别后的学生答卷进行切分、评分和汇总的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部协作者，只暴露能力
//! - `Embedder` - 文本向量化端口，`OpenAiEmbedder` 为默认实现
//! - `RecordStore` - 答卷、切分结果、评分结果与人工覆盖的存储端口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单份文本或单道题
//! - `segmenter` - 按题号切分整页文本
//! - `SimilarityScorer` / `MarkingEngine` - 相似度与评分策略
//! - `aggregator` - 报告、评语、班级统计
//! - `ReviewWriter` - 写复核清单能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份答卷"的完整评分流程
//! - `SubmissionCtx` - 上下文封装（submission_id + submission_index）
//! - `GradingFlow` - 流程编排（切分 → 并行评分 → 汇总）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量答卷处理器，管理资源和并发
//! - `orchestrator/submission_processor` - 单份答卷处理器，持有评分租约

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{Embedder, MemoryRecordStore, OpenAiEmbedder, RecordStore};
pub use models::{ClassSummary, Exam, ExamReport, QuestionResult, QuestionSpec, Submission};
pub use orchestrator::{process_submission, App, SubmissionOutcome};
pub use workflow::{GradedSubmission, GradingFlow, SubmissionCtx};
