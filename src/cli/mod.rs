//! CLI 모듈
//!
//! pg-rag CLI 명령어 정의 및 구현

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{EmbeddingBackend, RagConfig};
use crate::embedding::select_embedder;
use crate::knowledge::{PgVectorStore, WordChunker};
use crate::llm::{LanguageModel, OllamaLlm};
use crate::pipeline::{run_repl, IngestionPipeline, QueryEngine};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pg-rag")]
#[command(version, about = "Postgres pgvector 기반 RAG", long_about = None)]
pub struct Cli {
    /// 임베딩 백엔드 (기본값: EMBEDDING_BACKEND 또는 local)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<EmbeddingBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 폴더의 문서를 벡터 저장소에 수집
    Ingest {
        /// 수집할 폴더 경로 (기본값: DOCS_DIR 또는 docs)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 청크 크기 (단어)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// 청크 겹침 (단어)
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// 대화형 질의응답
    Query {
        /// 검색할 청크 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// 연결 및 테이블 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = RagConfig::from_env().context("설정 로드 실패")?;
    apply_overrides(&cli, &mut config);
    config.validate().context("잘못된 설정")?;

    match cli.command {
        Commands::Ingest { .. } => cmd_ingest(&config).await,
        Commands::Query { .. } => cmd_query(&config).await,
        Commands::Status => cmd_status(&config).await,
    }
}

/// CLI 플래그로 환경변수 설정 덮어쓰기
fn apply_overrides(cli: &Cli, config: &mut RagConfig) {
    if let Some(backend) = cli.backend {
        config.embedding.backend = backend;
    }

    match &cli.command {
        Commands::Ingest {
            dir,
            chunk_size,
            chunk_overlap,
        } => {
            if let Some(dir) = dir {
                config.docs_dir = dir.clone();
            }
            if let Some(size) = chunk_size {
                config.chunk.chunk_size = *size;
            }
            if let Some(overlap) = chunk_overlap {
                config.chunk.chunk_overlap = *overlap;
            }
        }
        Commands::Query { top_k } => {
            if let Some(k) = top_k {
                config.top_k = *k;
            }
        }
        Commands::Status => {}
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 문서 수집 명령어 (ingest)
async fn cmd_ingest(config: &RagConfig) -> Result<()> {
    println!("[*] 임베딩 백엔드 로드 중: {}", config.embedding.backend);
    let embedder = select_embedder(&config.embedding)
        .await
        .context("임베딩 백엔드 초기화 실패")?;

    println!("[*] 벡터 저장소 연결 중: {}", config.postgres.display_url());
    let store = PgVectorStore::open(&config.postgres, embedder.signature())
        .await
        .context("벡터 저장소 열기 실패")?;

    let chunker = WordChunker::new(config.chunk.clone()).context("청커 생성 실패")?;
    let pipeline = IngestionPipeline::new(embedder, Arc::new(store), Box::new(chunker))?;

    println!("[*] 문서 수집 중: {}", config.docs_dir.display());
    let report = pipeline
        .run(&config.docs_dir)
        .await
        .context("문서 수집 실패")?;

    println!(
        "[OK] Ingested {} documents ({} chunks) into Postgres vector store.",
        report.documents, report.chunks
    );
    if report.skipped_files > 0 {
        println!("[!] 건너뛴 파일: {}", report.skipped_files);
    }

    Ok(())
}

/// 질의 명령어 (query)
///
/// 표준 입력에서 질문을 읽어 exit/quit 또는 EOF까지 답변합니다.
async fn cmd_query(config: &RagConfig) -> Result<()> {
    let embedder = select_embedder(&config.embedding)
        .await
        .context("임베딩 백엔드 초기화 실패")?;

    let store = PgVectorStore::open(&config.postgres, embedder.signature())
        .await
        .context("벡터 저장소 열기 실패")?;

    let llm: Arc<dyn LanguageModel> =
        Arc::new(OllamaLlm::from_config(&config.ollama).context("LLM 클라이언트 생성 실패")?);

    let engine = QueryEngine::new(embedder, Arc::new(store), llm, config.top_k)?;

    println!("[OK] Connected. Type a question or 'exit' to quit.");

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let summary = run_repl(&engine, input, &mut output)
        .await
        .context("입출력 오류")?;

    tracing::info!(
        "Session ended: {} answered, {} failed",
        summary.answered,
        summary.failed
    );

    Ok(())
}

/// 상태 명령어 (status)
///
/// 데이터베이스 연결과 테이블 시그니처를 확인합니다. 테이블을 만들지 않습니다.
async fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("pg-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터베이스: {}", config.postgres.display_url());
    println!("[*] 임베딩 백엔드: {}", config.embedding.backend);
    println!(
        "[*] LLM: {} @ {}",
        config.ollama.model, config.ollama.base_url
    );

    let status = PgVectorStore::inspect(&config.postgres)
        .await
        .context("데이터베이스 연결 실패")?;
    println!("[OK] 데이터베이스 연결됨");

    match status {
        Some(status) => {
            println!("[OK] 테이블: {} ({} 청크)", status.table, status.rows);
            match status.signature {
                Some(signature) => println!("     임베딩: {}", signature),
                None => println!("[!] 임베딩 시그니처가 기록되지 않았습니다"),
            }
        }
        None => {
            println!(
                "[!] 테이블 '{}'이(가) 아직 없습니다. 먼저 ingest를 실행하세요.",
                config.postgres.table_name
            );
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RagConfig {
        RagConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::try_parse_from([
            "pg-rag",
            "--backend",
            "cloud",
            "ingest",
            "--dir",
            "manuals",
            "--chunk-size",
            "50",
            "--chunk-overlap",
            "5",
        ])
        .unwrap();

        let mut config = defaults();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.embedding.backend, EmbeddingBackend::Cloud);
        assert_eq!(config.docs_dir, PathBuf::from("manuals"));
        assert_eq!(config.chunk.chunk_size, 50);
        assert_eq!(config.chunk.chunk_overlap, 5);
    }

    #[test]
    fn test_backend_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["pg-rag", "query", "--backend", "local", "-k", "4"]).unwrap();

        let mut config = defaults();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let cli = Cli::try_parse_from(["pg-rag", "ingest"]).unwrap();

        let mut config = defaults();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.docs_dir, PathBuf::from("docs"));
        assert_eq!(config.chunk.chunk_size, 200);
        assert_eq!(config.chunk.chunk_overlap, 20);
    }

    #[test]
    fn test_invalid_overlap_rejected_after_override() {
        let cli =
            Cli::try_parse_from(["pg-rag", "ingest", "--chunk-size", "10", "--chunk-overlap", "10"])
                .unwrap();

        let mut config = defaults();
        apply_overrides(&cli, &mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flag_fixes_invalid_env_overlap() {
        let cli = Cli::try_parse_from(["pg-rag", "ingest", "--chunk-overlap", "20"]).unwrap();

        let mut config = RagConfig::from_lookup(|key| {
            (key == "CHUNK_OVERLAP").then(|| "300".to_string())
        })
        .unwrap();
        assert_eq!(config.chunk.chunk_overlap, 300);

        apply_overrides(&cli, &mut config);
        assert_eq!(config.chunk.chunk_overlap, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["pg-rag", "--backend", "gpu", "status"]).is_err());
    }
}
