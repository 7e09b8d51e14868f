//! pdf-qa - PDF 문서 기반 대화형 QA 챗봇
//!
//! 고정된 문서 하나를 청킹·임베딩하여 인메모리 인덱스를 만들고,
//! 질문마다 관련 세그먼트를 검색해 LLM에 근거로 전달합니다.
//! 답변 끝에는 근거 원문과 페이지 번호가 붙습니다.

pub mod chat;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod openai;

// Re-exports
pub use chat::{Answer, ChatSession, ConversationState, ConversationTurn, SessionState};
pub use config::QaConfig;
pub use document::{load_document, Document, Page};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use error::{QaError, Result};
pub use generation::{GenerationProvider, OpenAiChat};
pub use knowledge::{
    build_index, ChunkConfig, Chunker, DistanceMetric, FixedWindowChunker, InMemoryVectorStore,
    IndexStats, KnowledgeLoader, Retriever, SearchResult, Segment, VectorStore,
};
pub use openai::{get_api_key, has_api_key, OpenAiClient, RetryPolicy};
