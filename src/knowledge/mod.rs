//! Knowledge 모듈 - 문서 지식베이스
//!
//! - Chunker: 고정 크기 + 오버랩 윈도우 분할
//! - Vector: 벡터 저장소 트레이트와 유사도 함수
//! - Memory: 인메모리 전수 비교 인덱스
//! - Retriever: 쿼리 임베딩 → 상위 k개 세그먼트
//! - Loader: 문서 → 인덱스 구축 (메모이즈)

mod chunker;
mod loader;
mod memory;
mod retriever;
mod vector;

// Re-exports
pub use chunker::{ChunkConfig, Chunker, FixedWindowChunker, Segment};
pub use loader::{build_index, IndexStats, KnowledgeIndex, KnowledgeLoader};
pub use memory::InMemoryVectorStore;
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use vector::{
    cosine_similarity, dot_product, l2_distance, DistanceMetric, SearchResult, VectorEntry,
    VectorStore,
};
