//! 수집 → 질의 흐름 테스트 (메모리 저장소)

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{embedder, memory_store, write_file, RecordingLlm};
use pg_rag::pipeline::run_repl;
use pg_rag::{ChunkConfig, IngestionPipeline, QueryEngine, VectorStore, WordChunker};

fn chunker(size: usize, overlap: usize) -> Box<WordChunker> {
    Box::new(WordChunker::new(ChunkConfig::new(size, overlap).unwrap()).unwrap())
}

#[tokio::test]
async fn test_ingested_document_is_returned_as_source() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "fox.txt", b"The quick brown fox jumps over the lazy dog.");
    write_file(
        dir.path(),
        "postgres.md",
        b"pgvector adds a vector column type and cosine distance operators to Postgres.",
    );

    let store = memory_store();
    let (embedder, _) = embedder();
    let report = IngestionPipeline::new(embedder.clone(), store.clone(), chunker(200, 20))
        .unwrap()
        .run(dir.path())
        .await
        .unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks, 2);

    let llm = Arc::new(RecordingLlm::default());
    let engine = QueryEngine::new(embedder, store, llm.clone(), 2).unwrap();
    let response = engine.query("What does the quick brown fox do?").await.unwrap();

    assert_eq!(response.answer, "It jumps over the lazy dog.");
    assert_eq!(response.sources[0].node.file_name(), "fox.txt");
    assert!(response.sources[0].score > 0.0);
    assert!(response.sources[0].score >= response.sources[1].score);

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("The quick brown fox jumps over the lazy dog."));
    assert!(prompts[0].contains("Query: What does the quick brown fox do?"));
}

#[tokio::test]
async fn test_broken_pdf_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "notes.txt", b"alpha beta gamma");
    write_file(dir.path(), "broken.pdf", b"this is not a pdf");

    let store = memory_store();
    let (embedder, _) = embedder();
    let report = IngestionPipeline::new(embedder, store.clone(), chunker(200, 20))
        .unwrap()
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(report.documents, 1);
    assert_eq!(report.skipped_files, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_long_document_is_split_with_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let words: Vec<String> = (0..25).map(|i| format!("w{}", i)).collect();
    write_file(dir.path(), "long.txt", words.join(" ").as_bytes());

    let store = memory_store();
    let (embedder, provider) = embedder();
    let report = IngestionPipeline::new(embedder, store.clone(), chunker(10, 2))
        .unwrap()
        .run(dir.path())
        .await
        .unwrap();

    // 0..10, 8..18, 16..25
    assert_eq!(report.chunks, 3);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_repl_session_over_ingested_store() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "fox.txt", b"The quick brown fox jumps over the lazy dog.");

    let store = memory_store();
    let (embedder, provider) = embedder();
    IngestionPipeline::new(embedder.clone(), store.clone(), chunker(200, 20))
        .unwrap()
        .run(dir.path())
        .await
        .unwrap();
    let ingest_calls = provider.calls.load(Ordering::SeqCst);

    let engine = QueryEngine::new(embedder, store, Arc::new(RecordingLlm::default()), 2).unwrap();
    let mut output = Vec::new();
    let summary = run_repl(&engine, &b"what jumps?\n\nQUIT\nnever asked\n"[..], &mut output)
        .await
        .unwrap();

    assert_eq!(summary.answered, 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), ingest_calls + 1);

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("--- ANSWER ---\nIt jumps over the lazy dog.\n"));
    assert!(printed.contains("- fox.txt (score: "));
    assert!(!printed.contains("never asked"));
}
