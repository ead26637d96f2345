//! 에러 타입
//!
//! 모든 실패를 네 가지 종류로 분류합니다:
//! 설정 오류, 데이터 오류, 임베딩 불일치, 백엔드 오류.

use thiserror::Error;

/// 에러 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 자격 증명 누락, 잘못된 연결 파라미터 등 (시작 시 치명적)
    Config,
    /// 문서 없음, 손상된 문서
    Data,
    /// 벡터 차원 또는 저장된 임베딩 시그니처 불일치
    EmbeddingMismatch,
    /// DB 연결 불가, 모델 API 실패 등
    Backend,
}

/// pg-rag 에러
#[derive(Error, Debug)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no documents found in {0}")]
    NoDocuments(String),

    #[error("malformed document {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "table '{table}' was built with {stored}, but the active embedding backend is {requested}"
    )]
    SignatureMismatch {
        table: String,
        stored: String,
        requested: String,
    },

    #[error("database error: {0}")]
    Database(String),

    #[error("embedding backend error: {0}")]
    Embedding(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RagError {
    /// 에러 종류 분류
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::Config(_) => ErrorKind::Config,
            RagError::NoDocuments(_) | RagError::MalformedDocument { .. } => ErrorKind::Data,
            RagError::DimensionMismatch { .. } | RagError::SignatureMismatch { .. } => {
                ErrorKind::EmbeddingMismatch
            }
            RagError::Database(_)
            | RagError::Embedding(_)
            | RagError::Llm(_)
            | RagError::Http(_) => ErrorKind::Backend,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RagError::Config(msg.into())
    }
}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Configuration(_) => RagError::Config(e.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // 28P01 인증 실패, 28000 인증 명세 오류, 3D000 DB 없음, 42501 권한 없음
                Some("28P01" | "28000" | "3D000" | "42501") => RagError::Config(e.to_string()),
                _ => RagError::Database(e.to_string()),
            },
            _ => RagError::Database(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
