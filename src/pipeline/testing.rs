//! 파이프라인 테스트용 결정적 임베딩/LLM

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::{Embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

pub const TEST_DIMENSION: usize = 64;

/// 단어 해시 버킷 카운트 임베딩
#[derive(Default)]
pub struct BagOfWords {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for BagOfWords {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0; TEST_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                });
            v[(hash % TEST_DIMENSION as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

pub fn bag_of_words_embedder() -> Embedder {
    Embedder::new("test", Arc::new(BagOfWords::default()), 8)
}

/// 호출 횟수를 공유하는 임베딩
pub fn counting_embedder() -> (Embedder, Arc<BagOfWords>) {
    let provider = Arc::new(BagOfWords::default());
    (Embedder::new("test", provider.clone(), 8), provider)
}

/// 프롬프트의 질문을 되돌려주는 LLM
pub struct EchoLlm;

#[async_trait]
impl LanguageModel for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let question = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Query: "))
            .unwrap_or_default();
        Ok(format!("echo: {}", question))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// 항상 실패하는 LLM
pub struct DownLlm;

#[async_trait]
impl LanguageModel for DownLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(RagError::Llm("connection refused".into()))
    }

    fn name(&self) -> &str {
        "down"
    }
}
