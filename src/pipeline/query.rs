//! 질의 파이프라인
//!
//! 질문 임베딩 → 상위 K 청크 검색 → LLM 답변 생성.
//! 대화형 루프는 Idle / Processing / Terminal 세 상태를 오갑니다.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::knowledge::{ScoredNode, VectorStore};
use crate::llm::{build_qa_prompt, LanguageModel};

use super::ingest::ensure_same_space;

/// 종료 키워드 (대소문자 무시)
pub const EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];
/// 출처 미리보기 길이 (문자)
pub const PREVIEW_CHARS: usize = 250;

// ============================================================================
// QueryEngine
// ============================================================================

/// 질의 응답
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    /// 유사도 내림차순 출처
    pub sources: Vec<ScoredNode>,
}

pub struct QueryEngine {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
    top_k: usize,
}

impl QueryEngine {
    /// 질의 엔진 생성
    ///
    /// 임베딩 차원과 저장소 차원이 다르면 실패합니다.
    pub fn new(
        embedder: Embedder,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
        top_k: usize,
    ) -> Result<Self> {
        ensure_same_space(&embedder, store.as_ref())?;
        if top_k == 0 {
            return Err(RagError::config("top_k must be at least 1"));
        }
        Ok(Self {
            embedder,
            store,
            llm,
            top_k,
        })
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// 질문과 유사한 청크 검색
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredNode>> {
        let embedding = self.embedder.embed_query(question).await?;
        self.store.query(&embedding, self.top_k).await
    }

    /// 검색 후 답변 생성
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        let sources = self.retrieve(question).await?;
        tracing::debug!("Retrieved {} chunks for {:?}", sources.len(), question);

        let prompt = build_qa_prompt(question, &sources);
        let answer = self.llm.complete(&prompt).await?;

        Ok(QueryResponse { answer, sources })
    }
}

// ============================================================================
// Interactive Loop
// ============================================================================

/// 대화형 루프 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplState {
    /// 입력 대기
    Idle,
    /// 질문 처리 중
    Processing(String),
    /// 종료
    Terminal,
}

/// 세션 통계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub answered: usize,
    pub failed: usize,
}

/// 종료 키워드 여부
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_KEYWORDS.iter().any(|k| input.eq_ignore_ascii_case(k))
}

/// 입력이 끝나거나 종료 키워드를 받을 때까지 질문을 처리
///
/// 질문 하나의 실패는 출력만 하고 다음 입력을 계속 받습니다.
pub async fn run_repl<R, W>(engine: &QueryEngine, mut input: R, output: &mut W) -> io::Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut buf = Vec::new();
    let mut summary = SessionSummary::default();
    let mut state = ReplState::Idle;

    loop {
        state = match state {
            ReplState::Idle => {
                write!(output, "\n> ")?;
                output.flush()?;

                buf.clear();
                if input.read_until(b'\n', &mut buf).await? == 0 {
                    writeln!(output)?;
                    ReplState::Terminal
                } else {
                    // UTF-8이 아닌 입력도 세션을 끝내지 않음
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if is_exit_command(line) {
                        ReplState::Terminal
                    } else if line.is_empty() {
                        ReplState::Idle
                    } else {
                        ReplState::Processing(line.to_string())
                    }
                }
            }
            ReplState::Processing(question) => {
                match engine.query(&question).await {
                    Ok(response) => {
                        write_response(output, &response)?;
                        summary.answered += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Query failed: {}", e);
                        writeln!(output, "\n[!] 질의 실패: {}", e)?;
                        summary.failed += 1;
                    }
                }
                ReplState::Idle
            }
            ReplState::Terminal => break,
        };
    }

    Ok(summary)
}

/// 답변과 출처 출력
pub fn write_response<W: Write>(output: &mut W, response: &QueryResponse) -> io::Result<()> {
    writeln!(output, "\n--- ANSWER ---")?;
    writeln!(output, "{}", response.answer)?;

    writeln!(output, "\n--- SOURCES ---")?;
    for source in &response.sources {
        writeln!(
            output,
            "- {} (score: {:.3})",
            source.node.file_name(),
            source.score
        )?;
        writeln!(output, "  {}...\n", source_preview(&source.node.text))?;
    }
    Ok(())
}

/// 앞 250자, 줄바꿈(CR 포함)은 공백으로 (UTF-8 안전)
pub fn source_preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
