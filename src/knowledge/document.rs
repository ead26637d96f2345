//! 문서 / 노드 타입과 텍스트 정제

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 문서/노드 메타데이터 (file_name, file_path 등)
pub type Metadata = serde_json::Map<String, Value>;

/// 출처 파일명이 없을 때 표시할 이름
pub const UNKNOWN_SOURCE: &str = "unknown";

// ============================================================================
// Document
// ============================================================================

/// 로드된 원본 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// 문서 ID (노드의 ref_doc_id)
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    /// 새 ID로 문서 생성
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
        }
    }

    /// 텍스트를 정제한 문서 반환
    pub fn sanitized(self) -> Self {
        let text = sanitize_text(&self.text);
        Self { text, ..self }
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.metadata)
    }
}

// ============================================================================
// Node
// ============================================================================

/// 청크 (임베딩/검색 단위)
///
/// 부모 문서의 메타데이터를 그대로 물려받습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub ref_doc_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub metadata: Metadata,
}

impl Node {
    pub fn file_name(&self) -> &str {
        file_name_of(&self.metadata)
    }
}

/// 점수가 붙은 검색 결과 노드
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: Node,
    /// 코사인 유사도 (높을수록 유사)
    pub score: f32,
}

fn file_name_of(metadata: &Metadata) -> &str {
    metadata
        .get("file_name")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_SOURCE)
}

// ============================================================================
// Sanitization
// ============================================================================

/// 저장에 안전하지 않은 문자 제거
///
/// NUL 문자와 줄바꿈/탭을 제외한 제어 문자를 제거합니다.
/// Postgres TEXT 컬럼은 NUL을 저장할 수 없습니다.
pub fn sanitize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
