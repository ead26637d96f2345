//! 통합 테스트 공용 헬퍼

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pg_rag::{Embedder, EmbeddingProvider, LanguageModel, MemoryVectorStore, Result, StoreSignature};

pub const DIMENSION: usize = 32;

/// 소문자 단어를 해시 버킷에 세는 결정적 임베딩
#[derive(Default)]
pub struct HashingEmbedding {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(5381_u64, |h, b| h.wrapping_mul(33) ^ b as u64);
            vector[(bucket % DIMENSION as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

pub fn embedder() -> (Embedder, Arc<HashingEmbedding>) {
    let provider = Arc::new(HashingEmbedding::default());
    (Embedder::new("test", provider.clone(), 4), provider)
}

pub fn signature() -> StoreSignature {
    StoreSignature {
        backend: "test".into(),
        model: "hashing".into(),
        dimension: DIMENSION,
    }
}

pub fn memory_store() -> Arc<MemoryVectorStore> {
    Arc::new(MemoryVectorStore::new(signature()))
}

/// 받은 프롬프트를 기록하고 고정 답변을 돌려주는 LLM
#[derive(Default)]
pub struct RecordingLlm {
    pub prompts: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for RecordingLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok("It jumps over the lazy dog.".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) {
    std::fs::write(dir.join(name), contents).unwrap();
}
