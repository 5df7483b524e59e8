use std::fmt;

use crate::infrastructure::StoreError;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 记录存储错误
    Store(StoreError),
    /// 文件操作错误
    File(FileError),
    /// 业务逻辑错误
    Business(BusinessError),
    /// 配置错误
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Store(e) => write!(f, "存储错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Store(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Business(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::SerializeFailed { source } => write!(f, "序列化失败: {}", source),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::WriteFailed { source, .. }
            | FileError::SerializeFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 答卷与试卷不匹配
    ExamMismatch {
        submission_id: String,
        expected: String,
        actual: String,
    },
    /// 答卷正在被其他任务评分或已评分
    SubmissionBusy { submission_id: String },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ExamMismatch {
                submission_id,
                expected,
                actual,
            } => write!(
                f,
                "答卷 {} 属于试卷 {}，而不是 {}",
                submission_id, actual, expected
            ),
            BusinessError::SubmissionBusy { submission_id } => {
                write!(f, "答卷 {} 正在评分或已完成评分", submission_id)
            }
        }
    }
}

impl std::error::Error for BusinessError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 缺少必要配置
    Missing { var_name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { var_name } => write!(f, "缺少配置项 {}", var_name),
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// anyhow 已经为所有实现了 std::error::Error 的类型提供了自动转换

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::SerializeFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建试卷不匹配错误
    pub fn exam_mismatch(
        submission_id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        AppError::Business(BusinessError::ExamMismatch {
            submission_id: submission_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// 创建答卷占用错误
    pub fn submission_busy(submission_id: impl Into<String>) -> Self {
        AppError::Business(BusinessError::SubmissionBusy {
            submission_id: submission_id.into(),
        })
    }

    /// 创建缺少配置错误
    pub fn config_missing(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::Missing {
            var_name: var_name.into(),
        })
    }

    /// 是否为"答卷被占用"
    pub fn is_busy(&self) -> bool {
        matches!(self, AppError::Business(BusinessError::SubmissionBusy { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
