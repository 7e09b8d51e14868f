//! Retriever - 쿼리 임베딩 + 벡터 검색
//!
//! 쿼리 문자열을 임베딩하고 인덱스에서 상위 k개 세그먼트를 찾습니다.
//! 인덱스와 쿼리 임베딩이 같으면 결과도 항상 같습니다.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::embedding::EmbeddingProvider;

use super::vector::{SearchResult, VectorStore};

/// 기본 검색 개수
pub const DEFAULT_TOP_K: usize = 4;

/// 벡터 검색기
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// 새 검색기 생성
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// 쿼리와 가장 유사한 세그먼트 검색
    ///
    /// # Arguments
    /// * `query` - 검색 쿼리
    /// * `k` - 최대 결과 수
    ///
    /// # Returns
    /// 유사도 내림차순 결과 (최대 k개)
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(vec![]);
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let results = self
            .store
            .search(&query_embedding, k)
            .await
            .context("Vector search failed")?;

        tracing::debug!(
            "Retrieved {} segments for query ({} chars), pages={:?}",
            results.len(),
            query.chars().count(),
            results.iter().map(|r| r.segment.source_page).collect::<Vec<_>>()
        );

        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================
