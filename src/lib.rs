//! pg-rag - Postgres pgvector 기반 RAG
//!
//! 로컬 폴더의 문서를 청크로 나눠 임베딩한 뒤 pgvector 테이블에 저장하고,
//! 질문과 가까운 청크를 찾아 Ollama LLM으로 답변을 생성합니다.
//!
//! 임베딩 백엔드는 `local`(fastembed)과 `cloud`(Azure OpenAI) 중 하나이며,
//! 테이블은 처음 만든 백엔드의 시그니처를 기록해 다른 백엔드와 섞이지 않게 합니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod pipeline;

// Re-exports
pub use config::{EmbeddingBackend, RagConfig};
pub use embedding::{select_embedder, Embedder, EmbeddingProvider};
pub use error::{ErrorKind, RagError, Result};
pub use knowledge::{
    ChunkConfig, Chunker, Document, MemoryVectorStore, Node, PgVectorStore, ScoredNode,
    StoreSignature, VectorEntry, VectorStore, WordChunker,
};
pub use llm::{LanguageModel, OllamaLlm};
pub use pipeline::{IngestReport, IngestionPipeline, QueryEngine, QueryResponse};
