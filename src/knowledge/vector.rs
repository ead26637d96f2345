//! Vector Store - 벡터 저장소 트레이트 및 유틸리티
//!
//! 저장소는 생성 시점에 임베딩 시그니처(백엔드, 모델, 차원)가 고정되며
//! 모든 읽기/쓰기에서 차원이 일치해야 합니다.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

use super::document::{Node, ScoredNode};

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub node: Node,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 테이블을 만든 임베딩 백엔드 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSignature {
    /// 백엔드 식별자 ("local" | "cloud")
    pub backend: String,
    /// 모델 이름
    pub model: String,
    /// 벡터 차원
    pub dimension: usize,
}

impl fmt::Display for StoreSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({} dims)", self.backend, self.model, self.dimension)
    }
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 엔트리 일괄 저장 (전부 저장되거나 전부 실패)
    async fn add(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 코사인 유사도 기준 상위 `top_k` 검색 (내림차순)
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredNode>>;

    /// 저장된 노드 수
    async fn count(&self) -> Result<usize>;

    /// 저장소 시그니처
    fn signature(&self) -> &StoreSignature;

    /// 벡터 차원
    fn dimension(&self) -> usize {
        self.signature().dimension
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 벡터 길이가 기대 차원과 같은지 확인
pub fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) - -1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_empty() {
        let a: Vec<f32> = vec![];
        let b: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(3, &[0.0, 1.0, 2.0]).is_ok());

        let err = check_dimension(384, &[0.0; 1536]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
    }

    #[test]
    fn test_signature_display() {
        let sig = StoreSignature {
            backend: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            dimension: 384,
        };
        assert_eq!(sig.to_string(), "local:all-MiniLM-L6-v2 (384 dims)");
    }
}
