//! Knowledge 모듈 - 문서, 청킹, 벡터 저장소
//!
//! - Document/Node: 로드된 문서와 청크, 텍스트 정제
//! - Chunker: 겹치는 단어 윈도우 분할
//! - VectorStore: 저장소 트레이트
//! - PgVectorStore: Postgres pgvector 구현
//! - MemoryVectorStore: 프로세스 메모리 구현

mod chunker;
mod document;
mod memory;
mod pg;
mod vector;

// Re-exports
pub use chunker::{ChunkConfig, Chunker, WordChunker};
pub use document::{sanitize_text, Document, Metadata, Node, ScoredNode, UNKNOWN_SOURCE};
pub use memory::MemoryVectorStore;
pub use pg::{data_table_name, PgVectorStore, TableStatus, SIGNATURE_TABLE};
pub use vector::{check_dimension, cosine_similarity, StoreSignature, VectorEntry, VectorStore};
