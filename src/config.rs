use std::time::Duration;

/// 程序配置
///
/// 评分分档与权重是固定常量，不在此配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时评分的答卷数量
    pub max_concurrent_submissions: usize,
    /// 试卷定义文件（TOML）
    pub exam_file: String,
    /// OCR 识别文本存放目录（每个学生一个 .txt）
    pub answers_folder: String,
    /// 报告输出目录
    pub output_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件
    pub output_log_file: String,
    /// 人工复核清单文件
    pub review_file: String,
    // --- Embedding 配置 ---
    pub embedding_api_key: String,
    pub embedding_api_base_url: String,
    pub embedding_model_name: String,
    /// 单次 embedding 调用超时（秒）
    pub embedding_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 8,
            exam_file: "exam.toml".to_string(),
            answers_folder: "answers".to_string(),
            output_folder: "reports".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            review_file: "review.txt".to_string(),
            embedding_api_key: String::new(),
            embedding_api_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model_name: "text-embedding-3-small".to_string(),
            embedding_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置，缺失或无法解析的值使用默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            max_concurrent_submissions: lookup("MAX_CONCURRENT_SUBMISSIONS")
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.max_concurrent_submissions),
            exam_file: lookup("EXAM_FILE").unwrap_or(default.exam_file),
            answers_folder: lookup("ANSWERS_FOLDER").unwrap_or(default.answers_folder),
            output_folder: lookup("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            verbose_logging: lookup("VERBOSE_LOGGING").and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: lookup("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            review_file: lookup("REVIEW_FILE").unwrap_or(default.review_file),
            embedding_api_key: lookup("EMBEDDING_API_KEY").unwrap_or(default.embedding_api_key),
            embedding_api_base_url: lookup("EMBEDDING_API_BASE_URL").unwrap_or(default.embedding_api_base_url),
            embedding_model_name: lookup("EMBEDDING_MODEL_NAME").unwrap_or(default.embedding_model_name),
            embedding_timeout_secs: lookup("EMBEDDING_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(default.embedding_timeout_secs),
        }
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }
}
