//! Text Chunking Module
//!
//! 문서를 고정 크기의 겹치는 단어 윈도우로 분할합니다.
//! 문장 경계는 고려하지 않습니다.

use uuid::Uuid;

use crate::error::{RagError, Result};

use super::document::{Document, Node};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (단위: 단어)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 청크 최대 크기
    pub chunk_size: usize,
    /// 인접 청크 간 중첩 크기
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            chunk_overlap: 20,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// overlap < size 이어야 윈도우가 전진합니다
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::config("chunk size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;

    /// 문서를 노드로 분할 (메타데이터 상속)
    fn split(&self, doc: &Document) -> Vec<Node> {
        self.chunk(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Node {
                node_id: Uuid::new_v4().to_string(),
                ref_doc_id: doc.id.clone(),
                chunk_index: i,
                text,
                metadata: doc.metadata.clone(),
            })
            .collect()
    }
}

// ============================================================================
// WordChunker
// ============================================================================

/// 단어 윈도우 청커
///
/// `chunk_size` 단어씩 자르고 `chunk_size - chunk_overlap` 단어씩 전진합니다.
pub struct WordChunker {
    config: ChunkConfig,
}

impl WordChunker {
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let spans = word_spans(text);

        if spans.is_empty() {
            return vec![];
        }

        let size = self.config.chunk_size;
        let step = size - self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + size).min(spans.len());
            // 원문 슬라이스 (줄바꿈/들여쓰기 보존)
            chunks.push(text[spans[start].0..spans[end - 1].1].to_string());

            if end >= spans.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WordChunker"
    }
}

/// 공백으로 구분된 단어의 바이트 범위 `[start, end)`
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), word_start) {
            (true, Some(start)) => {
                spans.push((start, i));
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }
    if let Some(start) = word_start {
        spans.push((start, text.len()));
    }
    spans
}

// ============================================================================
// Tests
// ============================================================================
