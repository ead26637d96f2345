//! Postgres pgvector 저장소
//!
//! 테이블 `data_<TABLE_NAME>`에 청크 텍스트, 메타데이터, 임베딩을 저장합니다.
//! 테이블을 만든 임베딩 백엔드는 `rag_store_signature`에 기록되며
//! 열 때마다 현재 백엔드와 비교합니다.
//! ref: https://github.com/pgvector/pgvector

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use crate::config::PgConfig;
use crate::error::{RagError, Result};

use super::document::{Metadata, Node, ScoredNode};
use super::vector::{check_dimension, StoreSignature, VectorEntry, VectorStore};

/// 시그니처 테이블 이름
pub const SIGNATURE_TABLE: &str = "rag_store_signature";
/// 데이터 테이블 접두사
const DATA_TABLE_PREFIX: &str = "data_";
/// INSERT 한 번에 넣을 최대 행 수 (바인드 파라미터 65535개 제한)
const INSERT_BATCH_ROWS: usize = 1000;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Table Status
// ============================================================================

/// 테이블 상태 (status 명령어용)
#[derive(Debug, Clone)]
pub struct TableStatus {
    pub table: String,
    pub signature: Option<StoreSignature>,
    pub rows: usize,
}

// ============================================================================
// PgVectorStore
// ============================================================================

pub struct PgVectorStore {
    pool: PgPool,
    /// 따옴표 없는 데이터 테이블 이름 (소문자)
    table: String,
    signature: StoreSignature,
}

impl PgVectorStore {
    /// 저장소 열기 (없으면 생성)
    ///
    /// 같은 파라미터로 여러 번 호출해도 안전합니다.
    pub async fn open(config: &PgConfig, signature: StoreSignature) -> Result<Self> {
        let table = data_table_name(&config.table_name)?;
        let pool = connect(config).await?;
        Self::with_pool(pool, &table, signature).await
    }

    /// 기존 풀로 저장소 열기
    ///
    /// `table`은 `data_` 접두사가 붙은 실제 테이블 이름입니다.
    pub async fn with_pool(pool: PgPool, table: &str, signature: StoreSignature) -> Result<Self> {
        validate_identifier(table)?;
        let store = Self {
            pool,
            table: table.to_lowercase(),
            signature,
        };
        store.initialize().await?;

        tracing::debug!("Vector store ready: {} [{}]", store.table, store.signature);
        Ok(store)
    }

    /// 읽기 전용 상태 조회
    ///
    /// 테이블이나 확장을 만들지 않습니다. 테이블이 없으면 `None`.
    pub async fn inspect(config: &PgConfig) -> Result<Option<TableStatus>> {
        let table = data_table_name(&config.table_name)?;
        let pool = connect(config).await?;

        if !relation_exists(&pool, &table).await? {
            return Ok(None);
        }

        let signature = if relation_exists(&pool, SIGNATURE_TABLE).await? {
            fetch_signature(&pool, &table).await?
        } else {
            None
        };

        let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote(&table)))
            .fetch_one(&pool)
            .await?;

        Ok(Some(TableStatus {
            table,
            signature,
            rows: rows as usize,
        }))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 스키마 초기화 및 시그니처 검증
    async fn initialize(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&mut *tx)
            .await?;

        // 기존 테이블이면 선언된 벡터 차원 확인
        if let Some(dimension) = column_dimension(&mut tx, &self.table).await? {
            if dimension != self.signature.dimension {
                return Err(RagError::DimensionMismatch {
                    expected: self.signature.dimension,
                    actual: dimension,
                });
            }
        }

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                node_id TEXT NOT NULL UNIQUE,
                ref_doc_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                metadata_ JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                embedding VECTOR({}) NOT NULL
            )",
            quote(&self.table),
            self.signature.dimension
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                table_name TEXT PRIMARY KEY,
                backend TEXT NOT NULL,
                model TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            SIGNATURE_TABLE
        ))
        .execute(&mut *tx)
        .await?;

        match fetch_signature(&mut *tx, &self.table).await? {
            Some(stored) if stored == self.signature => {}
            Some(stored) if stored.dimension != self.signature.dimension => {
                return Err(RagError::DimensionMismatch {
                    expected: self.signature.dimension,
                    actual: stored.dimension,
                });
            }
            Some(stored) => {
                return Err(RagError::SignatureMismatch {
                    table: self.table.clone(),
                    stored: stored.to_string(),
                    requested: self.signature.to_string(),
                });
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO {} (table_name, backend, model, dimension) VALUES ($1, $2, $3, $4)",
                    SIGNATURE_TABLE
                ))
                .bind(&self.table)
                .bind(&self.signature.backend)
                .bind(&self.signature.model)
                .bind(self.signature.dimension as i32)
                .execute(&mut *tx)
                .await?;
                tracing::info!("Created vector table {} [{}]", self.table, self.signature);
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn add(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        // 쓰기 전에 전부 검증
        for entry in entries {
            check_dimension(self.signature.dimension, &entry.embedding)?;
        }

        let mut tx = self.pool.begin().await?;

        for batch in entries.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (node_id, ref_doc_id, chunk_index, text, metadata_, embedding) ",
                quote(&self.table)
            ));

            builder.push_values(batch, |mut row, entry| {
                row.push_bind(entry.node.node_id.clone())
                    .push_bind(entry.node.ref_doc_id.clone())
                    .push_bind(entry.node.chunk_index as i32)
                    .push_bind(entry.node.text.clone())
                    .push_bind(Json(entry.node.metadata.clone()))
                    .push_bind(vector_literal(&entry.embedding))
                    .push_unseparated("::vector");
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!("Inserted {} rows into {}", entries.len(), self.table);
        Ok(entries.len())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredNode>> {
        check_dimension(self.signature.dimension, embedding)?;

        let sql = format!(
            "SELECT node_id, ref_doc_id, chunk_index, text, metadata_,
                    1 - (embedding <=> $1::vector) AS score
             FROM {}
             ORDER BY embedding <=> $1::vector
             LIMIT $2",
            quote(&self.table)
        );

        let rows = sqlx::query(&sql)
            .bind(vector_literal(embedding))
            .bind(top_k as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(scored_node_from_row).collect()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote(&self.table)))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    fn signature(&self) -> &StoreSignature {
        &self.signature
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn connect(config: &PgConfig) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password);

    tracing::debug!("Connecting to {}", config.display_url());

    // 프로세스 수명 동안 연결 하나만 유지
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// `TABLE_NAME`에서 데이터 테이블 이름 생성
pub fn data_table_name(table_name: &str) -> Result<String> {
    let table = format!("{}{}", DATA_TABLE_PREFIX, table_name.to_lowercase());
    validate_identifier(&table)?;
    Ok(table)
}

/// SQL 식별자 검증 (DDL에는 바인드 파라미터를 쓸 수 없음)
fn validate_identifier(name: &str) -> Result<()> {
    static IDENT_RE: OnceLock<Regex> = OnceLock::new();
    let re = IDENT_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier regex is valid")
    });

    if re.is_match(name) {
        Ok(())
    } else {
        Err(RagError::config(format!(
            "invalid table name '{}': use letters, digits and underscores (max 63 chars)",
            name
        )))
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

/// pgvector 텍스트 표현 (`[1,2,3]`)
fn vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

async fn relation_exists(pool: &PgPool, name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_class c WHERE c.relname = $1 AND pg_table_is_visible(c.oid))",
    )
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// 기존 테이블의 `embedding` 컬럼 차원 (테이블이 없으면 `None`)
async fn column_dimension(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<Option<usize>> {
    // vector(n)의 atttypmod는 n, 차원 미지정이면 -1
    let typmod: Option<i32> = sqlx::query_scalar(
        "SELECT a.atttypmod FROM pg_attribute a
         JOIN pg_class c ON c.oid = a.attrelid
         WHERE c.relname = $1 AND pg_table_is_visible(c.oid)
           AND a.attname = 'embedding' AND NOT a.attisdropped",
    )
    .bind(table)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(typmod.filter(|&m| m > 0).map(|m| m as usize))
}

async fn fetch_signature<'e, E>(executor: E, table: &str) -> Result<Option<StoreSignature>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row: Option<(String, String, i32)> = sqlx::query_as(&format!(
        "SELECT backend, model, dimension FROM {} WHERE table_name = $1",
        SIGNATURE_TABLE
    ))
    .bind(table)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(backend, model, dimension)| StoreSignature {
        backend,
        model,
        dimension: dimension as usize,
    }))
}

fn scored_node_from_row(row: &PgRow) -> Result<ScoredNode> {
    let Json(metadata): Json<Metadata> = row.try_get("metadata_")?;
    let chunk_index: i32 = row.try_get("chunk_index")?;
    let score: f64 = row.try_get("score")?;

    Ok(ScoredNode {
        node: Node {
            node_id: row.try_get("node_id")?,
            ref_doc_id: row.try_get("ref_doc_id")?,
            chunk_index: chunk_index as usize,
            text: row.try_get("text")?,
            metadata,
        },
        score: score as f32,
    })
}

// ============================================================================
// Tests
// ============================================================================
