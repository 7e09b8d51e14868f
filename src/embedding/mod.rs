//! 임베딩 모듈 - OpenAI Embeddings API를 통한 텍스트 벡터화
//!
//! 세그먼트와 검색 쿼리를 같은 모델로 벡터화합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::new(client, DEFAULT_EMBEDDING_MODEL);
//! let embedding = embedder.embed("What is AWS?").await?;
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::openai::OpenAiClient;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// 요청 한 번에 보내는 최대 입력 수
const MAX_BATCH_INPUTS: usize = 100;

/// OpenAI 임베딩 구현체
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedding {
    /// 새 임베딩 인스턴스 생성
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 한 번의 API 호출로 입력 목록을 임베딩
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let response: EmbedResponse = self
            .client
            .post_json("embeddings", &request)
            .await
            .context("Embedding request failed")?;

        into_ordered_vectors(response, inputs.len())
    }
}

/// API 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// 응답을 입력 순서대로 정렬하고 개수를 검증
fn into_ordered_vectors(response: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    if data.len() != expected {
        anyhow::bail!(
            "Malformed embedding response: expected {} vectors, got {}",
            expected,
            data.len()
        );
    }

    data.sort_by_key(|d| d.index);

    if data.iter().any(|d| d.embedding.is_empty()) {
        anyhow::bail!("Malformed embedding response: empty vector");
    }

    if data.iter().any(|d| d.embedding.iter().any(|v| !v.is_finite())) {
        anyhow::bail!("Malformed embedding response: non-finite value");
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding API returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(MAX_BATCH_INPUTS).enumerate() {
            tracing::debug!(
                "Embedding batch {}/{} ({} inputs)",
                i + 1,
                texts.len().div_ceil(MAX_BATCH_INPUTS),
                batch.len()
            );
            results.extend(self.request(batch).await?);
        }

        Ok(results)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let inputs = vec!["a".to_string(), "b".to_string()];
        let request = EmbedRequest {
            model: DEFAULT_EMBEDDING_MODEL,
            input: &inputs,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-ada-002");
        assert_eq!(json["input"][1], "b");
    }

    #[test]
    fn test_response_reordered_by_index() {
        let body = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[0.0,1.0]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"model":"text-embedding-ada-002"}"#;
        let response: EmbedResponse = serde_json::from_str(body).unwrap();
        let vectors = into_ordered_vectors(response, 2).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_response_count_mismatch() {
        let body = r#"{"data":[{"index":0,"embedding":[1.0]}]}"#;
        let response: EmbedResponse = serde_json::from_str(body).unwrap();
        let err = into_ordered_vectors(response, 3).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_response_empty_vector() {
        let body = r#"{"data":[{"index":0,"embedding":[]}]}"#;
        let response: EmbedResponse = serde_json::from_str(body).unwrap();
        assert!(into_ordered_vectors(response, 1).is_err());
    }

    #[test]
    fn test_response_non_finite_value() {
        let response = EmbedResponse {
            data: vec![
                EmbeddingData {
                    index: 0,
                    embedding: vec![0.1, 0.2],
                },
                EmbeddingData {
                    index: 1,
                    embedding: vec![f32::INFINITY, 0.2],
                },
            ],
        };
        let err = into_ordered_vectors(response, 2).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    struct Constant;

    #[async_trait]
    impl EmbeddingProvider for Constant {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    #[tokio::test]
    async fn test_default_embed_batch_is_sequential() {
        let texts = vec!["a".to_string(), "abc".to_string()];
        let vectors = Constant.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0]]);
    }
}
