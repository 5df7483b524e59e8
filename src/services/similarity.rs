//! 相似度服务 - 业务能力层
//!
//! 只负责"参考答案 vs 学生作答"的语义相似度

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::infrastructure::{cosine_similarity, Embedder, EmbeddingError};

/// 相似度打分器
///
/// 职责：
/// - 调用 embedding 协作者并计算余弦相似度
/// - 结果截断到 [0, 1]
/// - 不持有可变状态，可在多个题目间并发使用
#[derive(Clone)]
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
    call_timeout: Duration,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>, call_timeout: Duration) -> Self {
        Self {
            embedder,
            call_timeout,
        }
    }

    /// 计算相似度
    ///
    /// 学生作答为空时直接返回 0，不调用 embedding
    pub async fn similarity(
        &self,
        model_answer: &str,
        student_answer: &str,
    ) -> Result<f64, EmbeddingError> {
        if student_answer.trim().is_empty() {
            return Ok(0.0);
        }

        let (model_vec, student_vec) =
            tokio::try_join!(self.embed(model_answer), self.embed(student_answer))?;

        let cosine = cosine_similarity(&model_vec, &student_vec)?;
        if !cosine.is_finite() {
            return Err(EmbeddingError::NonFinite(cosine));
        }
        let similarity = cosine.clamp(0.0, 1.0);
        debug!("余弦相似度: {:.4} (截断后 {:.4})", cosine, similarity);

        Ok(similarity)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        timeout(self.call_timeout, self.embedder.embed(text))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.call_timeout))?
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 评分相关测试共用的确定性 embedding 桩

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按文本查表返回固定向量，未登记的文本返回错误
    #[derive(Default)]
    pub struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        pub calls: AtomicUsize,
    }

    impl TableEmbedder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }

        /// 登记一对文本，使两者的余弦相似度恰好为 `similarity`
        pub fn with_pair(self, model: &str, student: &str, similarity: f64) -> Self {
            let s = similarity as f32;
            let orth = (1.0 - similarity * similarity).max(0.0).sqrt() as f32;
            self.with(model, vec![1.0, 0.0]).with(student, vec![s, orth])
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| EmbeddingError::Request {
                    model: "table".to_string(),
                    message: format!("未登记的文本: {}", text),
                })
        }
    }

    /// 永远不返回的 embedding，用于超时测试
    pub struct StalledEmbedder;

    #[async_trait]
    impl Embedder for StalledEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }
}
