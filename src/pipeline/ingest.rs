//! 수집 파이프라인
//!
//! 로드 → 정제 → 청킹 → 임베딩 → 저장 순서로 한 번 실행됩니다.
//! 임베딩이 하나라도 실패하면 저장 전에 중단하므로
//! 청크와 벡터 쌍이 어긋난 상태로 남지 않습니다.

use std::path::Path;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::extractor::DirectoryReader;
use crate::knowledge::{Chunker, Document, Node, VectorEntry, VectorStore};

/// 수집 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// 수집된 문서 수
    pub documents: usize,
    /// 저장된 청크 수
    pub chunks: usize,
    /// 건너뛴 파일 수
    pub skipped_files: usize,
}

pub struct IngestionPipeline {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    chunker: Box<dyn Chunker>,
    reader: DirectoryReader,
}

impl IngestionPipeline {
    /// 파이프라인 생성
    ///
    /// 임베딩 차원과 저장소 차원이 다르면 실패합니다.
    pub fn new(
        embedder: Embedder,
        store: Arc<dyn VectorStore>,
        chunker: Box<dyn Chunker>,
    ) -> Result<Self> {
        ensure_same_space(&embedder, store.as_ref())?;
        Ok(Self {
            embedder,
            store,
            chunker,
            reader: DirectoryReader::default(),
        })
    }

    pub fn with_reader(mut self, reader: DirectoryReader) -> Self {
        self.reader = reader;
        self
    }

    /// 폴더 수집 실행
    pub async fn run(&self, dir: &Path) -> Result<IngestReport> {
        let loaded = self.reader.load(dir).await?;
        tracing::info!(
            "Loaded {} documents from {} ({} files skipped)",
            loaded.documents.len(),
            dir.display(),
            loaded.skipped
        );

        let report = self.ingest_documents(loaded.documents).await?;
        Ok(IngestReport {
            skipped_files: loaded.skipped,
            ..report
        })
    }

    /// 이미 로드된 문서 수집
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let documents: Vec<Document> = documents.into_iter().map(Document::sanitized).collect();

        let nodes: Vec<Node> = documents
            .iter()
            .flat_map(|doc| self.chunker.split(doc))
            .collect();
        tracing::info!(
            "Split {} documents into {} chunks ({})",
            documents.len(),
            nodes.len(),
            self.chunker.name()
        );

        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let embeddings = self.embedder.embed_texts(&texts).await?;

        let entries: Vec<VectorEntry> = nodes
            .into_iter()
            .zip(embeddings)
            .map(|(node, embedding)| VectorEntry { node, embedding })
            .collect();

        let chunks = self.store.add(&entries).await?;

        Ok(IngestReport {
            documents: documents.len(),
            chunks,
            skipped_files: 0,
        })
    }
}

/// 임베딩 백엔드와 저장소가 같은 벡터 공간인지 확인
pub(crate) fn ensure_same_space(embedder: &Embedder, store: &dyn VectorStore) -> Result<()> {
    if embedder.dimension() != store.dimension() {
        return Err(RagError::DimensionMismatch {
            expected: store.dimension(),
            actual: embedder.dimension(),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
