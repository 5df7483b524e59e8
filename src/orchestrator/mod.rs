//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量答卷处理器
//! - 管理应用生命周期（初始化、运行）
//! - 加载试卷与全部答卷并登记到记录存储
//! - 控制并发数量（Semaphore）
//! - 输出报告、班级统计和全局统计信息
//!
//! ### `submission_processor` - 单份答卷处理器
//! - 获取评分租约，保证同一份答卷不会被并发评分
//! - 调用 GradingFlow，保存切分与评分结果
//! - 写入复核清单，释放租约
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Submission>)
//!     ↓
//! submission_processor (处理单份 Submission)
//!     ↓
//! workflow::GradingFlow (切分 → 评分 → 汇总)
//!     ↓
//! services (能力层：segmenter / marking / aggregator / review)
//!     ↓
//! infrastructure (基础设施：Embedder / RecordStore)
//! ```

pub mod batch_processor;
pub mod submission_processor;

pub use batch_processor::App;
pub use submission_processor::{process_submission, SubmissionOutcome};
