//! 文本向量化 - 基础设施层
//!
//! 持有外部 embedding 客户端，只暴露"文本 → 向量"的能力
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 的 embeddings 接口
//! - 兼容 OpenAI API 的服务（自定义 API 端点和模型）

use async_openai::{config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// 向量化错误
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding 请求失败 (模型: {model}): {message}")]
    Request { model: String, message: String },

    #[error("embedding 返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },

    #[error("embedding 调用超时 ({0:?})")]
    Timeout(Duration),

    #[error("向量维度不一致: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("相似度不是有限数值: {0}")]
    NonFinite(f64),
}

/// 向量化能力
///
/// 职责：
/// - 文本 → 固定长度向量，纯函数语义
/// - 只读共享，可并发调用
/// - 不认识 Question / Submission
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// 基于 OpenAI 兼容接口的向量化实现
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.embedding_api_key)
            .with_api_base(&config.embedding_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.embedding_model_name.clone(),
        }
    }

    fn request_error(&self, message: impl std::fmt::Display) -> EmbeddingError {
        EmbeddingError::Request {
            model: self.model_name.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(
            "调用 embedding API，模型: {}, 文本长度: {} 字符",
            self.model_name,
            text.chars().count()
        );

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model_name)
            .input(text)
            .build()
            .map_err(|e| self.request_error(e))?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            warn!("embedding API 调用失败: {}", e);
            self.request_error(e)
        })?;

        response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::EmptyResponse {
                model: self.model_name.clone(),
            })
    }
}

/// 余弦相似度
///
/// 维度不一致返回错误；任一向量为零向量时返回 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot / (norm_a * norm_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [0.3f32, 0.4, 0.5];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { left: 1, right: 2 }
        ));
    }
}
