//! 파이프라인 모듈
//!
//! 두 파이프라인 모두 `Embedder`와 `VectorStore`를 생성자로 받습니다.

mod ingest;
mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use ingest::{IngestReport, IngestionPipeline};
pub use query::{
    is_exit_command, run_repl, source_preview, write_response, QueryEngine, QueryResponse,
    SessionSummary, EXIT_KEYWORDS, PREVIEW_CHARS,
};
