//! 프로세스 메모리 벡터 저장소
//!
//! Postgres 저장소와 같은 계약(차원 검증, 일괄 저장, 코사인 검색)을 따르며
//! 데이터는 프로세스 종료 시 사라집니다.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RagError, Result};

use super::document::ScoredNode;
use super::vector::{check_dimension, cosine_similarity, StoreSignature, VectorEntry, VectorStore};

pub struct MemoryVectorStore {
    signature: StoreSignature,
    entries: Mutex<Vec<VectorEntry>>,
}

impl MemoryVectorStore {
    pub fn new(signature: StoreSignature) -> Self {
        Self {
            signature,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<VectorEntry>>> {
        self.entries
            .lock()
            .map_err(|e| RagError::Database(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, entries: &[VectorEntry]) -> Result<usize> {
        // 하나라도 차원이 다르면 아무것도 저장하지 않음
        for entry in entries {
            check_dimension(self.signature.dimension, &entry.embedding)?;
        }

        self.lock()?.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredNode>> {
        check_dimension(self.signature.dimension, embedding)?;

        let entries = self.lock()?;
        let mut scored: Vec<ScoredNode> = entries
            .iter()
            .map(|e| ScoredNode {
                node: e.node.clone(),
                score: cosine_similarity(embedding, &e.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn signature(&self) -> &StoreSignature {
        &self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::knowledge::document::{Metadata, Node};

    fn signature(dimension: usize) -> StoreSignature {
        StoreSignature {
            backend: "test".into(),
            model: "unit".into(),
            dimension,
        }
    }

    fn entry(name: &str, embedding: Vec<f32>) -> VectorEntry {
        let mut metadata = Metadata::new();
        metadata.insert("file_name".into(), name.into());
        VectorEntry {
            node: Node {
                node_id: format!("{}-0", name),
                ref_doc_id: name.to_string(),
                chunk_index: 0,
                text: format!("text of {}", name),
                metadata,
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_add_and_query_orders_by_similarity() {
        let store = MemoryVectorStore::new(signature(3));
        store
            .add(&[
                entry("x.txt", vec![1.0, 0.0, 0.0]),
                entry("y.txt", vec![0.0, 1.0, 0.0]),
                entry("xy.txt", vec![1.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.query(&[1.0, 0.1, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].node.file_name(), "x.txt");
        assert_eq!(results[1].node.file_name(), "xy.txt");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_add_rejects_wrong_dimension_atomically() {
        let store = MemoryVectorStore::new(signature(3));
        let err = store
            .add(&[entry("ok.txt", vec![1.0, 0.0, 0.0]), entry("bad.txt", vec![1.0])])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_rejects_wrong_dimension() {
        let store = MemoryVectorStore::new(signature(3));
        let err = store.query(&[1.0, 0.0], 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
    }
}
