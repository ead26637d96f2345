//! 콘텐츠 추출 모듈
//!
//! 수집된 파일에서 텍스트를 읽어 `Document`로 만듭니다.
//! - 텍스트 파일: 직접 읽기 (UTF-8이 아니면 손실 변환)
//! - PDF 파일: pdf-extract로 페이지별 추출

pub mod pdf;

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::collector::{CollectedFile, FileCollector, FileType};
use crate::error::{RagError, Result};
use crate::knowledge::{Document, Metadata};

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 파일에서 문서 추출 (PDF는 페이지별 문서)
    pub async fn extract(&self, file: &CollectedFile) -> Result<Vec<Document>> {
        match file.file_type {
            FileType::Text => self.extract_text(file).await,
            FileType::Pdf => self.extract_pdf(file).await,
        }
    }

    /// 텍스트 파일에서 추출
    async fn extract_text(&self, file: &CollectedFile) -> Result<Vec<Document>> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| malformed(&file.path, e))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        Ok(vec![Document::new(text, file_metadata(file))])
    }

    /// PDF 파일에서 추출
    async fn extract_pdf(&self, file: &CollectedFile) -> Result<Vec<Document>> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let path = file.path.clone();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&path))
            .await
            .map_err(|e| malformed(&file.path, e))??;

        Ok(pages
            .into_iter()
            .map(|(page_num, text)| {
                let mut metadata = file_metadata(file);
                metadata.insert("page_label".into(), Value::String(page_num.to_string()));
                Document::new(text, metadata)
            })
            .collect())
    }
}

/// 파일 메타데이터 구성
pub fn file_metadata(file: &CollectedFile) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "file_path".into(),
        Value::String(file.path.display().to_string()),
    );
    metadata.insert("file_name".into(), Value::String(file.file_name().to_string()));
    metadata.insert("file_type".into(), Value::String(FileType::mime_for(&file.path).to_string()));
    metadata.insert("file_size".into(), Value::from(file.size));
    if let Some(created) = file.created_at {
        metadata.insert("creation_date".into(), Value::String(format_date(created)));
    }
    if let Some(modified) = file.modified_at {
        metadata.insert("last_modified_date".into(), Value::String(format_date(modified)));
    }
    metadata
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string()
}

fn malformed(path: &Path, reason: impl std::fmt::Display) -> RagError {
    RagError::MalformedDocument {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// Directory Reader
// ============================================================================

/// 폴더 로드 결과
#[derive(Debug)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    /// 추출에 실패해 건너뛴 파일 수
    pub skipped: usize,
}

/// 폴더 → 문서 목록
#[derive(Debug, Clone, Default)]
pub struct DirectoryReader {
    collector: FileCollector,
    extractor: ContentExtractor,
}

impl DirectoryReader {
    pub fn new(collector: FileCollector) -> Self {
        Self {
            collector,
            extractor: ContentExtractor::new(),
        }
    }

    /// 폴더의 모든 문서 로드
    ///
    /// 파일 단위 실패는 로그를 남기고 건너뜁니다.
    /// 로드된 문서가 없으면 `NoDocuments`.
    pub async fn load(&self, dir: &Path) -> Result<LoadedDocuments> {
        let files = self.collector.collect_directory(dir)?;

        let mut documents = Vec::new();
        let mut skipped = 0;

        for file in &files {
            match self.extractor.extract(file).await {
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.path.display(), e);
                    skipped += 1;
                }
            }
        }

        if documents.is_empty() {
            return Err(RagError::NoDocuments(dir.display().to_string()));
        }

        Ok(LoadedDocuments { documents, skipped })
    }
}

// ============================================================================
// Tests
// ============================================================================
