//! Vector Store - 벡터 검색 트레이트 및 유사도 함수
//!
//! 세그먼트 임베딩을 저장하고 쿼리 벡터로 최근접 이웃을 찾는 인터페이스입니다.

use anyhow::Result;
use async_trait::async_trait;

use super::chunker::Segment;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 원본 세그먼트
    pub segment: Segment,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// 매칭된 세그먼트
    pub segment: Segment,
    /// 유사도 스코어 (높을수록 유사)
    pub similarity: f32,
}

/// 거리/유사도 측정 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// 유클리드 거리 (flat L2 인덱스와 동일)
    #[default]
    L2,
    /// 내적
    InnerProduct,
    /// 코사인 유사도
    Cosine,
}

impl DistanceMetric {
    /// 유사도 스코어 계산 (모든 방식에서 높을수록 유사)
    ///
    /// L2는 `1 / (1 + distance)`로 변환하여 (0, 1] 범위가 됩니다.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => 1.0 / (1.0 + l2_distance(a, b)),
            DistanceMetric::InnerProduct => dot_product(a, b),
            DistanceMetric::Cosine => cosine_similarity(a, b),
        }
    }

    /// 문자열에서 파싱 (`l2`, `ip`, `cosine`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Some(DistanceMetric::L2),
            "ip" | "inner" | "inner_product" | "dot" => Some(DistanceMetric::InnerProduct),
            "cosine" | "cos" => Some(DistanceMetric::Cosine),
            _ => None,
        }
    }
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 생성 후에는 읽기 전용입니다. 점진적 추가는 지원하지 않습니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 벡터 검색 (유사도 내림차순, 동점이면 먼저 저장된 세그먼트 우선)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// 저장된 벡터 개수
    fn count(&self) -> usize;

    /// 벡터 차원 (비어 있으면 None)
    fn dimension(&self) -> Option<usize>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 내적
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// 유클리드 거리
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product(a, b) / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
