//! 로컬 sentence-transformer 임베딩 (fastembed / ONNX Runtime)
//!
//! 최초 실행 시 모델을 내려받아 캐시하며, 이후에는 네트워크를 쓰지 않습니다.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{RagError, Result};

use super::EmbeddingProvider;

/// 로컬 모델 이름
pub const LOCAL_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// all-MiniLM-L6-v2 출력 차원
pub const LOCAL_EMBEDDING_DIMENSION: usize = 384;

pub struct LocalEmbedding {
    model: Arc<TextEmbedding>,
}

impl LocalEmbedding {
    /// 모델 로드 (CPU 바운드이므로 spawn_blocking 사용)
    pub async fn load(cache_dir: Option<PathBuf>) -> Result<Self> {
        let model = tokio::task::spawn_blocking(move || {
            let mut options =
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| RagError::Embedding(format!("model load task failed: {}", e)))?
        .map_err(|e| {
            RagError::Embedding(format!(
                "failed to load local model {}: {}",
                LOCAL_EMBEDDING_MODEL, e
            ))
        })?;

        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| RagError::Embedding("Empty response from local model".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| RagError::Embedding(format!("embedding task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("local embedding failed: {}", e)))
    }

    fn dimension(&self) -> usize {
        LOCAL_EMBEDDING_DIMENSION
    }

    fn name(&self) -> &str {
        LOCAL_EMBEDDING_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingBackend, EmbeddingConfig};
    use crate::embedding::select_embedder;

    #[tokio::test]
    #[ignore = "downloads the model"]
    async fn test_local_model_dimension_and_signature() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Local,
            azure: Default::default(),
            batch_size: 4,
            cache_dir: std::env::var("FASTEMBED_CACHE_DIR").ok().map(PathBuf::from),
        };
        let embedder = select_embedder(&config).await.unwrap();

        let signature = embedder.signature();
        assert_eq!(signature.backend, "local");
        assert_eq!(signature.model, LOCAL_EMBEDDING_MODEL);
        assert_eq!(signature.dimension, LOCAL_EMBEDDING_DIMENSION);

        let texts = vec!["The quick brown fox".to_string(), "pgvector stores embeddings".to_string()];
        let embeddings = embedder.embed_texts(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|e| e.len() == LOCAL_EMBEDDING_DIMENSION));

        let query = embedder.embed_query("fox").await.unwrap();
        assert_eq!(query.len(), 384);
    }
}
