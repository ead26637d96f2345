//! 언어 모델 모듈 - 로컬 Ollama 서버로 답변 생성
//!
//! ref: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-completion

mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OllamaConfig;
use crate::error::{RagError, Result};

pub use prompt::build_qa_prompt;

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// 프롬프트 → 생성 텍스트
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama `/api/generate` 클라이언트
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    url: Url,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

impl OllamaLlm {
    pub fn from_config(config: &OllamaConfig) -> Result<Self> {
        let url = generate_url(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            model: config.model.clone(),
            client,
        })
    }
}

/// `{base}/api/generate` (베이스 URL의 경로 접두사 유지)
fn generate_url(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim()).map_err(|e| {
        RagError::config(format!("OLLAMA_BASE_URL is not a valid URL ({}): {}", e, base_url))
    })?;

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join("api/generate")
        .map_err(|e| RagError::config(format!("Invalid Ollama URL: {}", e)))
}

#[async_trait]
impl LanguageModel for OllamaLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!("Sending prompt to {} ({} chars)", self.model, prompt.len());

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(RagError::Llm(format!("Ollama error ({}): {}", status, message)));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(parsed.response.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
