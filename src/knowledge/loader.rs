//! Knowledge Loader - 문서 → 세그먼트 → 임베딩 → 인덱스
//!
//! 시작 시 한 번 실행되는 파이프라인입니다. 결과는 async once-cell에 보관되어
//! 반복 호출 시 캐시된 인덱스를 돌려줍니다. 실패하면 셀은 비어 있는 채로 남고,
//! 다음 `initialize()` 호출이 처음부터 다시 시도합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::document::{load_document, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};

use super::chunker::{ChunkConfig, Chunker, FixedWindowChunker};
use super::memory::InMemoryVectorStore;
use super::vector::{DistanceMetric, VectorEntry, VectorStore};

/// 구축된 지식베이스
#[derive(Debug)]
pub struct KnowledgeIndex {
    /// 원본 문서 경로
    pub source: PathBuf,
    /// 페이지 수
    pub page_count: usize,
    /// 벡터 저장소
    pub store: Arc<InMemoryVectorStore>,
}

impl KnowledgeIndex {
    /// 인덱스 통계
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            page_count: self.page_count,
            segment_count: self.store.count(),
            dimension: self.store.dimension(),
        }
    }
}

/// 인덱스 통계
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub page_count: usize,
    pub segment_count: usize,
    pub dimension: Option<usize>,
}

/// 문서를 분할·임베딩하여 인덱스 구축
///
/// 추출 가능한 텍스트가 없으면 `DocumentLoad` 에러입니다.
pub async fn build_index(
    document: &Document,
    chunker: &dyn Chunker,
    embedder: &dyn EmbeddingProvider,
    metric: DistanceMetric,
) -> Result<KnowledgeIndex> {
    let segments = chunker.split(document);
    if segments.is_empty() {
        return Err(QaError::DocumentLoad(format!(
            "no extractable text in {}",
            document.source.display()
        )));
    }

    tracing::info!(
        "Embedding {} segments with {} ({})",
        segments.len(),
        embedder.name(),
        chunker.name()
    );

    let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let embeddings = embedder
        .embed_batch(&texts)
        .await
        .map_err(QaError::service)?;

    if embeddings.len() != segments.len() {
        return Err(QaError::Service(format!(
            "embedding service returned {} vectors for {} segments",
            embeddings.len(),
            segments.len()
        )));
    }

    let entries: Vec<VectorEntry> = segments
        .into_iter()
        .zip(embeddings)
        .map(|(segment, embedding)| VectorEntry { segment, embedding })
        .collect();

    let store = InMemoryVectorStore::build(entries, metric).map_err(QaError::service)?;

    Ok(KnowledgeIndex {
        source: document.source.clone(),
        page_count: document.pages.len(),
        store: Arc::new(store),
    })
}

// ============================================================================
// KnowledgeLoader
// ============================================================================

/// 메모이즈된 지식베이스 로더
pub struct KnowledgeLoader {
    document_path: PathBuf,
    chunk_config: ChunkConfig,
    metric: DistanceMetric,
    embedder: Arc<dyn EmbeddingProvider>,
    cell: OnceCell<Arc<KnowledgeIndex>>,
}

impl KnowledgeLoader {
    /// 새 로더 생성 (아직 아무것도 읽지 않음)
    pub fn new(
        document_path: impl Into<PathBuf>,
        chunk_config: ChunkConfig,
        metric: DistanceMetric,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            chunk_config,
            metric,
            embedder,
            cell: OnceCell::new(),
        }
    }

    /// 지식베이스 초기화 (최초 1회만 실제 구축)
    pub async fn initialize(&self) -> Result<Arc<KnowledgeIndex>> {
        self.cell
            .get_or_try_init(|| async {
                let index = self.build().await.map_err(|e| {
                    tracing::warn!("Knowledge base initialization failed: {}", e);
                    e
                })?;
                Ok::<_, QaError>(Arc::new(index))
            })
            .await
            .cloned()
    }

    /// 초기화된 인덱스 (없으면 None)
    pub fn get(&self) -> Option<Arc<KnowledgeIndex>> {
        self.cell.get().cloned()
    }

    /// 초기화 여부
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// 캐시 초기화 (다음 `initialize()`에서 다시 구축)
    pub fn reset(&mut self) {
        if self.cell.take().is_some() {
            tracing::info!("Knowledge base cache cleared");
        }
    }

    /// 문서 경로
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    async fn build(&self) -> Result<KnowledgeIndex> {
        let chunker = FixedWindowChunker::new(self.chunk_config)?;
        let document = load_document(&self.document_path).await?;
        let index = build_index(&document, &chunker, self.embedder.as_ref(), self.metric).await?;

        let stats = index.stats();
        tracing::info!(
            "Knowledge base ready: {} (pages={}, segments={}, dimension={:?})",
            self.document_path.display(),
            stats.page_count,
            stats.segment_count,
            stats.dimension
        );

        Ok(index)
    }
}

// ============================================================================
// Tests
// ============================================================================
