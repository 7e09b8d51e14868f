//! In-Memory Vector Store - 전수 비교(exact) 벡터 검색
//!
//! 단일 문서 규모에서는 ANN 인덱스 없이 모든 벡터와 비교해도 충분합니다.
//! 생성 시 한 번만 구축되며 이후 읽기 전용이므로 잠금 없이 공유됩니다.

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::vector::{DistanceMetric, SearchResult, VectorEntry, VectorStore};

/// 인메모리 벡터 저장소
#[derive(Debug, Clone)]
pub struct InMemoryVectorStore {
    entries: Vec<VectorEntry>,
    metric: DistanceMetric,
    dimension: Option<usize>,
}

impl InMemoryVectorStore {
    /// 엔트리 목록으로 저장소 구축
    ///
    /// 모든 벡터의 차원이 같아야 합니다. 빈 벡터는 허용하지 않습니다.
    pub fn build(entries: Vec<VectorEntry>, metric: DistanceMetric) -> Result<Self> {
        let dimension = entries.first().map(|e| e.embedding.len());

        if dimension == Some(0) {
            bail!("Embedding vectors must not be empty");
        }

        if let Some(dim) = dimension {
            if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dim) {
                bail!(
                    "Embedding dimension mismatch: segment {} has {} values, expected {}",
                    bad.segment.index,
                    bad.embedding.len(),
                    dim
                );
            }
        }

        tracing::debug!(
            "Built in-memory vector store (entries={}, dimension={:?}, metric={:?})",
            entries.len(),
            dimension,
            metric
        );

        Ok(Self {
            entries,
            metric,
            dimension,
        })
    }

    /// 사용 중인 측정 방식
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// 저장된 엔트리 (삽입 순서)
    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 || self.entries.is_empty() {
            return Ok(vec![]);
        }

        if let Some(dim) = self.dimension {
            if query_embedding.len() != dim {
                bail!(
                    "Query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    dim
                );
            }
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| {
                let similarity = self.metric.score(query_embedding, &entry.embedding);
                SearchResult {
                    segment: entry.segment.clone(),
                    // 오버플로 등으로 NaN이 나오면 최하위
                    similarity: if similarity.is_nan() {
                        f32::NEG_INFINITY
                    } else {
                        similarity
                    },
                }
            })
            .collect();

        // 안정 정렬: 동점이면 삽입 순서 유지
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);

        Ok(results)
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

// ============================================================================
// Tests
// ============================================================================
