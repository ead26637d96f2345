//! Azure OpenAI 임베딩
//!
//! source: https://learn.microsoft.com/azure/ai-services/openai/reference#embeddings

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AzureConfig;
use crate::error::{RagError, Result};

use super::EmbeddingProvider;

/// 클라우드 임베딩 모델
pub const AZURE_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// text-embedding-3-small 출력 차원
pub const AZURE_EMBEDDING_DIMENSION: usize = 1536;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure OpenAI 임베딩 구현체
pub struct AzureOpenAiEmbedding {
    api_key: String,
    url: Url,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureOpenAiEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiEmbedding")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Azure API 에러 응답
#[derive(Debug, Deserialize)]
struct AzureError {
    error: AzureErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AzureErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl AzureOpenAiEmbedding {
    /// 설정에서 생성
    ///
    /// 키나 엔드포인트가 없으면 설정 오류를 반환합니다.
    pub fn from_config(config: &AzureConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            RagError::config(
                "AZURE_OPENAI_KEY is not set.\n\
                 The cloud embedding backend needs AZURE_OPENAI_KEY and AZURE_OPENAI_ENDPOINT \
                 (AZURE_OPENAI_API_VERSION is optional).",
            )
        })?;
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            RagError::config(
                "AZURE_OPENAI_ENDPOINT is not set.\n\
                 Example: export AZURE_OPENAI_ENDPOINT=https://<resource>.openai.azure.com",
            )
        })?;

        let url = embeddings_url(endpoint, &config.deployment, &config.api_version)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RagError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            url,
            client,
        })
    }
}

/// `{endpoint}/openai/deployments/{deployment}/embeddings?api-version=...`
fn embeddings_url(endpoint: &str, deployment: &str, api_version: &str) -> Result<Url> {
    let mut base = Url::parse(endpoint.trim()).map_err(|e| {
        RagError::config(format!("AZURE_OPENAI_ENDPOINT is not a valid URL ({}): {}", e, endpoint))
    })?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(RagError::config(format!(
            "AZURE_OPENAI_ENDPOINT must be an http(s) URL: {}",
            endpoint
        )));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base
        .join(&format!("openai/deployments/{}/embeddings", deployment))
        .map_err(|e| RagError::config(format!("Invalid deployment name '{}': {}", deployment, e)))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| RagError::Embedding("Empty response from Azure OpenAI".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&EmbedRequest { input: texts })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AzureError>(&body) {
                return Err(RagError::Embedding(format!(
                    "Azure OpenAI error ({} {}): {}",
                    status,
                    error.error.code.unwrap_or_default(),
                    error.error.message
                )));
            }
            return Err(RagError::Embedding(format!(
                "Azure OpenAI error ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbedResponse = serde_json::from_str(&body).map_err(|e| {
            RagError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        // 응답 순서는 index 필드 기준
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        AZURE_EMBEDDING_DIMENSION
    }

    fn name(&self) -> &str {
        AZURE_EMBEDDING_MODEL
    }
}

// ============================================================================
// Tests
// ============================================================================
