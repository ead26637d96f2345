//! 설정 모듈
//!
//! 환경변수에서 읽은 설정을 하나의 `RagConfig` 값으로 묶습니다.
//! 임베딩 백엔드 선택은 전역 플래그가 아닌 이 값으로 수집/질의 파이프라인에 전달됩니다.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::knowledge::ChunkConfig;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PG_HOST: &str = "localhost";
pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_DATABASE: &str = "vectordb";
pub const DEFAULT_PG_USER: &str = "postgres";
pub const DEFAULT_PG_PASSWORD: &str = "password";
pub const DEFAULT_TABLE_NAME: &str = "documents";

pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "text-embedding-3-small";

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_DOCS_DIR: &str = "docs";
/// 질의 시 가져올 청크 수
pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 16;

// ============================================================================
// Embedding Backend
// ============================================================================

/// 임베딩 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmbeddingBackend {
    /// 로컬 sentence-transformer 모델 (all-MiniLM-L6-v2, 384차원)
    #[default]
    Local,
    /// Azure OpenAI 임베딩 API (text-embedding-3-small, 1536차원)
    Cloud,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingBackend::Local => "local",
            EmbeddingBackend::Cloud => "cloud",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "huggingface" => Ok(EmbeddingBackend::Local),
            "cloud" | "azure" | "openai" => Ok(EmbeddingBackend::Cloud),
            other => Err(RagError::config(format!(
                "unknown embedding backend '{}' (expected 'local' or 'cloud')",
                other
            ))),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Azure OpenAI 자격 증명
///
/// 키와 엔드포인트는 cloud 백엔드를 선택할 때 검증됩니다.
#[derive(Clone, Default)]
pub struct AzureConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: String,
    pub deployment: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .finish()
    }
}

/// 임베딩 설정
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub azure: AzureConfig,
    pub batch_size: usize,
    /// fastembed 모델 캐시 디렉토리 (없으면 fastembed 기본값)
    pub cache_dir: Option<PathBuf>,
}

/// Postgres 연결 파라미터
#[derive(Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub table_name: String,
}

impl PgConfig {
    /// 비밀번호를 가린 연결 문자열 (로그/상태 출력용)
    pub fn display_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConfig")
            .field("url", &self.display_url())
            .field("table_name", &self.table_name)
            .finish()
    }
}

/// Ollama 설정
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

// ============================================================================
// RagConfig
// ============================================================================

/// 전체 설정
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub embedding: EmbeddingConfig,
    pub postgres: PgConfig,
    pub ollama: OllamaConfig,
    pub chunk: ChunkConfig,
    pub docs_dir: PathBuf,
    pub top_k: usize,
}

impl RagConfig {
    /// 프로세스 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드
    ///
    /// 빈 값은 설정되지 않은 것으로 취급합니다. 파싱만 하고 범위 검증은
    /// CLI 덮어쓰기 이후 `validate`에서 합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let backend = match get("EMBEDDING_BACKEND") {
            Some(v) => v.parse()?,
            None => EmbeddingBackend::default(),
        };

        let embedding = EmbeddingConfig {
            backend,
            azure: AzureConfig {
                api_key: get("AZURE_OPENAI_KEY"),
                endpoint: get("AZURE_OPENAI_ENDPOINT"),
                api_version: get_or("AZURE_OPENAI_API_VERSION", DEFAULT_AZURE_API_VERSION),
                deployment: get_or("AZURE_OPENAI_EMBEDDING_DEPLOYMENT", DEFAULT_AZURE_DEPLOYMENT),
            },
            batch_size: parse_or(get("EMBED_BATCH_SIZE"), "EMBED_BATCH_SIZE", DEFAULT_EMBED_BATCH_SIZE)?,
            cache_dir: get("FASTEMBED_CACHE_DIR").map(PathBuf::from),
        };

        let postgres = PgConfig {
            host: get_or("PGHOST", DEFAULT_PG_HOST),
            port: parse_or(get("PGPORT"), "PGPORT", DEFAULT_PG_PORT)?,
            database: get_or("PGDATABASE", DEFAULT_PG_DATABASE),
            user: get_or("PGUSER", DEFAULT_PG_USER),
            password: get_or("PGPASSWORD", DEFAULT_PG_PASSWORD),
            table_name: get_or("TABLE_NAME", DEFAULT_TABLE_NAME),
        };

        let ollama = OllamaConfig {
            base_url: get_or("OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL),
            model: get_or("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            timeout_secs: parse_or(
                get("OLLAMA_TIMEOUT_SECS"),
                "OLLAMA_TIMEOUT_SECS",
                DEFAULT_OLLAMA_TIMEOUT_SECS,
            )?,
        };

        let defaults = ChunkConfig::default();
        let chunk = ChunkConfig {
            chunk_size: parse_or(get("CHUNK_SIZE"), "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(get("CHUNK_OVERLAP"), "CHUNK_OVERLAP", defaults.chunk_overlap)?,
        };

        Ok(Self {
            embedding,
            postgres,
            ollama,
            chunk,
            docs_dir: PathBuf::from(get_or("DOCS_DIR", DEFAULT_DOCS_DIR)),
            top_k: parse_or(get("TOP_K"), "TOP_K", DEFAULT_TOP_K)?,
        })
    }

    /// 값 범위 검증 (CLI 플래그 적용 후 한 번)
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;
        if self.top_k == 0 {
            return Err(RagError::config("TOP_K must be at least 1"));
        }
        if self.embedding.batch_size == 0 {
            return Err(RagError::config("EMBED_BATCH_SIZE must be at least 1"));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| RagError::config(format!("{} has an invalid value: '{}'", key, v))),
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================
