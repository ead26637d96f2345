//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 두 가지 백엔드를 지원합니다:
//! - `local`: fastembed로 all-MiniLM-L6-v2 실행 (384차원)
//! - `cloud`: Azure OpenAI text-embedding-3-small (1536차원)
//!
//! 선택 결과는 `Embedder` 하나로 묶여 반환되며,
//! 차원은 프로바이더에서만 읽습니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = select_embedder(&config.embedding).await?;
//! let store = PgVectorStore::open(&config.postgres, embedder.signature()).await?;
//! ```

mod azure;
mod local;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{RagError, Result};
use crate::knowledge::{check_dimension, StoreSignature};

pub use azure::{AzureOpenAiEmbedding, AZURE_EMBEDDING_DIMENSION, AZURE_EMBEDDING_MODEL};
pub use local::{LocalEmbedding, LOCAL_EMBEDDING_DIMENSION, LOCAL_EMBEDDING_MODEL};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Embedder
// ============================================================================

/// 선택된 임베딩 백엔드
///
/// 프로바이더와 그 차원을 함께 들고 다니며,
/// 반환되는 모든 벡터의 길이를 검증합니다.
#[derive(Clone)]
pub struct Embedder {
    backend: String,
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("backend", &self.backend)
            .field("model", &self.provider.name())
            .field("dimension", &self.provider.dimension())
            .finish()
    }
}

impl Embedder {
    pub fn new(
        backend: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            backend: backend.into(),
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn model(&self) -> &str {
        self.provider.name()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// 저장소 시그니처 (테이블 생성/검증용)
    pub fn signature(&self) -> StoreSignature {
        StoreSignature {
            backend: self.backend.clone(),
            model: self.model().to_string(),
            dimension: self.dimension(),
        }
    }

    /// 질문 텍스트 임베딩
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.provider.embed(text).await?;
        self.validate(&embedding)?;
        Ok(embedding)
    }

    /// 여러 텍스트를 `batch_size` 단위로 임베딩
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        let batches = texts.len().div_ceil(self.batch_size);

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!("Embedding batch {}/{}", i + 1, batches);

            let embeddings = self.provider.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    self.provider.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }

            for embedding in &embeddings {
                self.validate(embedding)?;
            }
            results.extend(embeddings);
        }

        Ok(results)
    }

    fn validate(&self, embedding: &[f32]) -> Result<()> {
        check_dimension(self.dimension(), embedding)?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(RagError::Embedding(format!(
                "{} returned a non-finite value",
                self.provider.name()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정된 백엔드로 임베딩 프로바이더 생성
///
/// 선택한 백엔드의 설정이 잘못되었으면 즉시 실패합니다 (다른 백엔드로 대체하지 않음).
pub async fn select_embedder(config: &EmbeddingConfig) -> Result<Embedder> {
    let provider: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::Local => Arc::new(LocalEmbedding::load(config.cache_dir.clone()).await?),
        EmbeddingBackend::Cloud => Arc::new(AzureOpenAiEmbedding::from_config(&config.azure)?),
    };

    tracing::info!(
        "Using {} embedding: {} (dimension: {})",
        config.backend,
        provider.name(),
        provider.dimension()
    );

    Ok(Embedder::new(
        config.backend.as_str(),
        provider,
        config.batch_size,
    ))
}

// ============================================================================
// Tests
// ============================================================================
