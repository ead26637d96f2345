//! pgvector 통합 테스트
//!
//! 실행 중인 Postgres + pgvector가 필요합니다.
//! 연결 정보는 PGHOST/PGPORT/PGDATABASE/PGUSER/PGPASSWORD 환경변수를 사용합니다.
//!
//! ```sh
//! cargo test --test integration_pgvector -- --ignored
//! ```

mod common;

use std::sync::Arc;

use common::{embedder, signature, DIMENSION};
use pg_rag::config::PgConfig;
use pg_rag::knowledge::{data_table_name, SIGNATURE_TABLE};
use pg_rag::{
    ChunkConfig, Document, ErrorKind, IngestionPipeline, PgVectorStore, RagConfig, StoreSignature,
    VectorStore, WordChunker,
};

/// 테스트마다 고유한 테이블 이름
fn test_config() -> PgConfig {
    let mut config = RagConfig::from_env().unwrap().postgres;
    config.table_name = format!("test_{}", uuid::Uuid::new_v4().simple());
    config
}

async fn drop_table(store: &PgVectorStore) {
    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", store.table()))
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query(&format!("DELETE FROM {} WHERE table_name = $1", SIGNATURE_TABLE))
        .bind(store.table())
        .execute(store.pool())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres with pgvector"]
async fn test_open_twice_with_same_parameters() {
    let config = test_config();

    let first = PgVectorStore::open(&config, signature()).await.unwrap();
    let second = PgVectorStore::open(&config, signature()).await.unwrap();

    assert_eq!(first.table(), data_table_name(&config.table_name).unwrap());
    assert_eq!(second.dimension(), DIMENSION);
    assert_eq!(second.count().await.unwrap(), 0);

    drop_table(&first).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with pgvector"]
async fn test_reopen_with_other_dimension_fails() {
    let config = test_config();
    let store = PgVectorStore::open(&config, signature()).await.unwrap();

    let wider = StoreSignature {
        dimension: DIMENSION * 2,
        ..signature()
    };
    let err = PgVectorStore::open(&config, wider).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);

    drop_table(&store).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with pgvector"]
async fn test_reopen_with_other_model_fails() {
    let config = test_config();
    let store = PgVectorStore::open(&config, signature()).await.unwrap();

    let other = StoreSignature {
        model: "another-model".into(),
        ..signature()
    };
    let err = PgVectorStore::open(&config, other).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);

    drop_table(&store).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with pgvector"]
async fn test_ingest_then_query_round_trip() {
    let config = test_config();
    let store = Arc::new(PgVectorStore::open(&config, signature()).await.unwrap());
    let (embedder, _) = embedder();

    let mut metadata = pg_rag::knowledge::Metadata::new();
    metadata.insert("file_name".into(), "fox.txt".into());
    let chunker = WordChunker::new(ChunkConfig::default()).unwrap();

    let report = IngestionPipeline::new(embedder.clone(), store.clone(), Box::new(chunker))
        .unwrap()
        .ingest_documents(vec![Document::new(
            "The quick brown fox jumps over the lazy dog.",
            metadata,
        )])
        .await
        .unwrap();
    assert_eq!(report.chunks, 1);

    let query = embedder.embed_query("quick brown fox").await.unwrap();
    let results = store.query(&query, 2).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node.file_name(), "fox.txt");
    assert!(results[0].score > 0.0);

    let status = PgVectorStore::inspect(&config).await.unwrap().unwrap();
    assert_eq!(status.rows, 1);
    assert_eq!(status.signature, Some(signature()));

    drop_table(&store).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with pgvector"]
async fn test_inspect_missing_table() {
    let config = test_config();
    assert!(PgVectorStore::inspect(&config).await.unwrap().is_none());
}
