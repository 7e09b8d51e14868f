//! Text Chunking Module
//!
//! 문서를 고정 크기 윈도우로 분할합니다.
//! 인접 세그먼트는 설정된 문자 수만큼 겹쳐서, 청크 경계에 걸친 문장도
//! 최소 하나의 세그먼트에서 온전히 검색될 수 있게 합니다.

use crate::document::{Document, Page};
use crate::error::{QaError, Result};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 세그먼트 최대 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 세그먼트 간 오버랩 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// 설정 생성 (검증 포함)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(QaError::Configuration(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(QaError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// 윈도우 이동 간격
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

// ============================================================================
// Segment
// ============================================================================

/// 검색 단위가 되는 문서 조각
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// 문서 전체에서의 순번 (0-based)
    pub index: usize,
    /// 세그먼트 텍스트
    pub text: String,
    /// 원본 페이지 번호 (1-based)
    pub source_page: usize,
    /// 페이지 내 시작 위치 (문자 단위)
    pub offset: usize,
}

impl Segment {
    /// 문자 수
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 문서를 세그먼트로 분할
    fn split(&self, document: &Document) -> Vec<Segment>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// FixedWindowChunker
// ============================================================================

/// 고정 크기 윈도우 청커
///
/// 각 페이지를 `chunk_size` 문자 윈도우로 자르고,
/// `chunk_size - chunk_overlap` 문자씩 전진합니다.
/// 페이지를 넘어서 병합하지 않습니다.
pub struct FixedWindowChunker {
    config: ChunkConfig,
}

impl FixedWindowChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정(1000/200)으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    /// 현재 설정
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 한 페이지를 분할 (index는 `first_index`부터 부여)
    fn split_page(&self, page: &Page, first_index: usize) -> Vec<Segment> {
        if page.text.is_empty() {
            return vec![];
        }

        // 문자 경계의 바이트 위치 (마지막에 끝 위치 추가)
        let bounds: Vec<usize> = page
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(page.text.len()))
            .collect();
        let char_count = bounds.len() - 1;

        let mut segments = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.config.chunk_size).min(char_count);

            segments.push(Segment {
                index: first_index + segments.len(),
                text: page.text[bounds[start]..bounds[end]].to_string(),
                source_page: page.number,
                offset: start,
            });

            if end >= char_count {
                break;
            }
            start += self.config.step();
        }

        segments
    }
}

impl Chunker for FixedWindowChunker {
    fn split(&self, document: &Document) -> Vec<Segment> {
        let mut segments = Vec::new();

        for page in &document.pages {
            let page_segments = self.split_page(page, segments.len());
            if page_segments.is_empty() {
                tracing::debug!("Page {} has no text, skipping", page.number);
            }
            segments.extend(page_segments);
        }

        segments
    }

    fn name(&self) -> &'static str {
        "FixedWindowChunker"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> FixedWindowChunker {
        FixedWindowChunker::new(ChunkConfig::new(size, overlap).unwrap()).unwrap()
    }

    /// 위치를 알 수 있도록 숫자를 반복한 텍스트
    fn sample_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'0' + (i % 10) as u8))
            .collect()
    }

    #[test]
    fn test_two_page_scenario() {
        let doc = Document::from_pages("mem", [sample_text(1500), sample_text(500)]);
        let segments = FixedWindowChunker::with_defaults().split(&doc);

        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].source_page, 1);
        assert_eq!(segments[0].offset, 0);
        assert_eq!(segments[0].char_len(), 1000);

        assert_eq!(segments[1].source_page, 1);
        assert_eq!(segments[1].offset, 800);
        assert_eq!(segments[1].char_len(), 700);

        assert_eq!(segments[2].source_page, 2);
        assert_eq!(segments[2].offset, 0);
        assert_eq!(segments[2].char_len(), 500);

        let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let doc = Document::from_pages("mem", ["", "hello"]);
        let segments = chunker(10, 2).split(&doc);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].source_page, 2);
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::from_pages("mem", Vec::<String>::new());
        assert!(chunker(10, 2).split(&doc).is_empty());
    }

    #[test]
    fn test_segment_length_bounds() {
        let doc = Document::from_pages("mem", [sample_text(2345), sample_text(7)]);
        for segment in chunker(100, 30).split(&doc) {
            assert!(segment.char_len() > 0);
            assert!(segment.char_len() <= 100);
        }
    }

    #[test]
    fn test_consecutive_segments_share_overlap() {
        let text = sample_text(1234);
        let doc = Document::from_pages("mem", [text.clone()]);
        let segments = chunker(100, 30).split(&doc);

        for pair in segments.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            let tail: String = prev[prev.len() - 30..].iter().collect();
            let head: String = next[..30].iter().collect();
            assert_eq!(tail, head);
            assert_eq!(pair[1].offset - pair[0].offset, 70);
        }
    }

    #[test]
    fn test_coverage_with_redundancy() {
        let doc = Document::from_pages("mem", [sample_text(1500), sample_text(999)]);
        let segments = FixedWindowChunker::with_defaults().split(&doc);
        let total: usize = segments.iter().map(|s| s.char_len()).sum();
        assert!(total >= doc.total_chars());

        // 세그먼트를 오프셋으로 되짚으면 원문이 복원된다
        let page1: Vec<&Segment> = segments.iter().filter(|s| s.source_page == 1).collect();
        let mut rebuilt: Vec<char> = Vec::new();
        for s in page1 {
            let chars: Vec<char> = s.text.chars().collect();
            let skip = rebuilt.len().saturating_sub(s.offset);
            rebuilt.extend_from_slice(&chars[skip..]);
        }
        assert_eq!(rebuilt.iter().collect::<String>(), doc.pages[0].text);
    }

    #[test]
    fn test_exact_multiple_has_no_tiny_tail() {
        // 1000자 페이지는 윈도우 하나로 끝난다
        let doc = Document::from_pages("mem", [sample_text(1000)]);
        let segments = FixedWindowChunker::with_defaults().split(&doc);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "가나다라마바사아자차카타파하".repeat(3);
        let doc = Document::from_pages("mem", [text]);
        let segments = chunker(10, 3).split(&doc);

        assert!(segments.len() > 1);
        assert_eq!(segments[0].text.chars().count(), 10);
        assert_eq!(segments[1].offset, 7);
        assert!(segments[1].text.starts_with("아자차"));
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(100, 100).is_err());
        assert!(ChunkConfig::new(100, 150).is_err());
        assert!(ChunkConfig::new(100, 0).is_ok());

        let default = ChunkConfig::default();
        assert_eq!(default.chunk_size, 1000);
        assert_eq!(default.chunk_overlap, 200);
        assert_eq!(default.step(), 800);
    }
}
