use anyhow::Result;
/// 日志工具模块
///
/// 运行日志文件头、批次进度和最终统计
use std::fs;
use tracing::info;

use crate::models::Exam;

/// 写入运行日志文件头，记录本次阅卷的试卷
pub fn init_log_file(log_file_path: &str, exam: &Exam) -> Result<()> {
    let header = format!(
        "# 阅卷日志 {}\n# 试卷: {} ({}), {} 道题, 满分 {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        exam.title,
        exam.id,
        exam.questions.len(),
        exam.max_marks()
    );
    fs::write(log_file_path, header)?;
    Ok(())
}

/// 记录本次运行的规模
pub fn log_run_plan(exam_file: &str, total: usize, max_concurrent: usize) {
    info!(
        "🚀 {}: {} 份答卷，每批 {} 份，共 {} 批",
        exam_file,
        total,
        max_concurrent,
        total.div_ceil(max_concurrent.max(1))
    );
}

/// 记录批次进度，`first..=last` 为本批答卷编号
pub fn log_batch_start(batch_num: usize, total_batches: usize, first: usize, last: usize) {
    info!("📦 第 {}/{} 批: 答卷 {}-{}", batch_num, total_batches, first, last);
}

/// 整次运行的计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub graded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 累加一个批次的结果
    pub fn add_batch(&mut self, batch_num: usize, graded: usize, skipped: usize, failed: usize) {
        self.graded += graded;
        self.skipped += skipped;
        self.failed += failed;
        info!(
            "✓ 第 {} 批完成: 评分 {}，跳过 {}，失败 {}",
            batch_num, graded, skipped, failed
        );
    }

    /// 已有结论的答卷数
    pub fn finished(&self) -> usize {
        self.graded + self.skipped + self.failed
    }

    pub fn log_summary(&self, log_file_path: &str) {
        info!(
            "📊 阅卷结束: 评分 {}/{}，跳过 {}，失败 {}",
            self.graded, self.total, self.skipped, self.failed
        );
        if self.finished() < self.total {
            info!("⚠️ {} 份答卷没有结论", self.total - self.finished());
        }
        info!("日志文件: {}", log_file_path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
