//! 基础设施层（Infrastructure）
//!
//! 持有外部协作者，只暴露能力：
//! - `embedder` - 文本向量化（embedding 模型）
//! - `record_store` - 记录存储端口及进程内实现

pub mod embedder;
pub mod record_store;

pub use embedder::{cosine_similarity, Embedder, EmbeddingError, OpenAiEmbedder};
pub use record_store::{MemoryRecordStore, RecordStore, StoreError};
