//! 파일 수집 모듈
//!
//! 문서 폴더를 하위 폴더까지 훑어 읽을 수 있는 문서 파일 목록을 만듭니다.
//! 숨김 파일은 건너뛰고, 결과는 경로 순으로 정렬됩니다.
//! 확장자를 모르는 파일(README, 소스 코드 등)은 앞부분에 NUL 바이트가 없으면 텍스트로 봅니다.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::{DirEntry, WalkBuilder};

use crate::error::{RagError, Result};

/// 평문으로 읽는 확장자
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "json", "html", "htm", "xml", "yaml", "yml", "toml",
    "log",
];

/// 기본 최대 파일 크기 (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 바이너리 판별에 읽는 앞부분 크기 (8KiB)
pub const BINARY_SNIFF_BYTES: u64 = 8 * 1024;

// ============================================================================
// File Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Text,
    Pdf,
}

impl FileType {
    /// 확장자 → 타입 (대소문자 무시)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if ext == "pdf" {
            Some(FileType::Pdf)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileType::Text)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// 확장자로 못 정하면 내용으로 판별 (바이너리면 `None`)
    pub fn detect(path: &Path) -> std::io::Result<Option<Self>> {
        if let Some(file_type) = Self::from_path(path) {
            return Ok(Some(file_type));
        }
        Ok((!looks_binary(path)?).then_some(FileType::Text))
    }

    /// 메타데이터 `file_type`에 쓰는 MIME 타입
    pub fn mime_for(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("pdf") => "application/pdf",
            Some("md" | "markdown") => "text/markdown",
            Some("csv") => "text/csv",
            Some("html" | "htm") => "text/html",
            Some("json") => "application/json",
            Some("xml") => "application/xml",
            Some("yaml" | "yml") => "application/yaml",
            Some("toml") => "application/toml",
            _ => "text/plain",
        }
    }
}

// ============================================================================
// Collected File
// ============================================================================

/// 수집 대상 파일과 파일시스템 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    pub path: PathBuf,
    pub file_type: FileType,
    /// 바이트
    pub size: u64,
    /// 파일시스템이 지원할 때만 있음
    pub created_at: Option<SystemTime>,
    pub modified_at: Option<SystemTime>,
}

impl CollectedFile {
    /// 바이너리 파일이거나 일반 파일이 아니면 `Ok(None)`
    pub fn from_path(path: PathBuf) -> std::io::Result<Option<Self>> {
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Ok(None);
        }

        let Some(file_type) = FileType::detect(&path)? else {
            tracing::debug!("Skipping binary file {}", path.display());
            return Ok(None);
        };

        Ok(Some(Self {
            file_type,
            size: meta.len(),
            created_at: meta.created().ok(),
            modified_at: meta.modified().ok(),
            path,
        }))
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(crate::knowledge::UNKNOWN_SOURCE)
    }
}

// ============================================================================
// File Collector
// ============================================================================

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore / .ignore 규칙 적용
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    /// 0이면 제한 없음
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: false,
            include_hidden: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 폴더 재귀 수집
    ///
    /// 폴더가 없거나 지원하는 파일이 하나도 없으면 `NoDocuments`.
    pub fn collect_directory(&self, dir: &Path) -> Result<Vec<CollectedFile>> {
        let no_documents = || RagError::NoDocuments(dir.display().to_string());

        if !dir.is_dir() {
            return Err(no_documents());
        }
        let root = dir.canonicalize().map_err(|_| no_documents())?;

        let gitignore = self.config.respect_gitignore;
        let files: Vec<CollectedFile> = WalkBuilder::new(&root)
            .hidden(!self.config.include_hidden)
            .ignore(gitignore)
            .git_ignore(gitignore)
            .git_global(gitignore)
            .git_exclude(gitignore)
            .parents(gitignore)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    None
                }
            })
            .filter(is_regular_file)
            .filter_map(|entry| self.accept(entry.into_path()))
            .collect();

        if files.is_empty() {
            return Err(no_documents());
        }

        tracing::info!("Collected {} files from {}", files.len(), root.display());
        Ok(files)
    }

    fn accept(&self, path: PathBuf) -> Option<CollectedFile> {
        let file = match CollectedFile::from_path(path) {
            Ok(file) => file?,
            Err(e) => {
                tracing::warn!("Cannot stat file: {}", e);
                return None;
            }
        };

        let limit = self.config.max_file_size;
        if limit > 0 && file.size > limit {
            tracing::debug!(
                "Skipping {} ({} bytes > {} bytes)",
                file.path.display(),
                file.size,
                limit
            );
            return None;
        }
        Some(file)
    }
}

fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|ft| ft.is_file())
}

/// 앞 8KiB에 NUL 바이트가 있으면 바이너리
fn looks_binary(path: &Path) -> std::io::Result<bool> {
    let mut head = Vec::new();
    std::fs::File::open(path)?
        .take(BINARY_SNIFF_BYTES)
        .read_to_end(&mut head)?;
    Ok(head.contains(&0))
}

// ============================================================================
// Tests
// ============================================================================
