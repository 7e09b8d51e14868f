//! 문서 로드 모듈
//!
//! 질의 대상 문서를 페이지 단위로 읽어옵니다.
//! - PDF 파일: pdf-extract로 페이지별 텍스트 추출
//! - 그 외 파일: UTF-8 텍스트로 직접 읽기 (폼피드 또는 `--- Page N ---`로 페이지 구분)

pub mod pdf;

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{QaError, Result};

// ============================================================================
// Types
// ============================================================================

/// 문서의 한 페이지
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 페이지 번호 (1부터 시작)
    pub number: usize,
    /// 추출된 텍스트
    pub text: String,
}

/// 로드된 문서 (불변)
#[derive(Debug, Clone)]
pub struct Document {
    /// 원본 파일 경로
    pub source: PathBuf,
    /// 페이지 목록 (순서 유지)
    pub pages: Vec<Page>,
}

impl Document {
    /// 페이지 텍스트 목록으로 문서 생성 (페이지 번호는 1부터 부여)
    pub fn from_pages<I, S>(source: impl Into<PathBuf>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i + 1,
                text: text.into(),
            })
            .collect();

        Self {
            source: source.into(),
            pages,
        }
    }

    /// 전체 문자 수 (바이트가 아닌 문자 기준)
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    /// 텍스트가 하나도 없는지 여부
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// 파일에서 문서 로드
///
/// 확장자가 `.pdf`이면 PDF로, 그 외에는 텍스트 파일로 처리합니다.
pub async fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(QaError::DocumentLoad(format!(
            "document not found: {}",
            path.display()
        )));
    }

    let pages = if is_pdf(path) {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf::extract_pages_from_pdf(&owned))
            .await
            .context("PDF extraction task failed")
            .and_then(|r| r)
            .map_err(|e| QaError::DocumentLoad(format!("{:#}", e)))?
    } else {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| QaError::DocumentLoad(format!("{}: {}", path.display(), e)))?;
        split_text_pages(&text)
    };

    let document = Document::from_pages(path, pages);

    if document.is_blank() {
        return Err(QaError::DocumentLoad(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    tracing::info!(
        "Loaded document: {} (pages={}, chars={})",
        path.display(),
        document.pages.len(),
        document.total_chars()
    );

    Ok(document)
}

/// 텍스트 파일 내용을 페이지별로 분리
///
/// 폼피드(`\x0c`)를 우선 사용하고, 없으면 `--- Page N ---` 형태의
/// 구분선을 시도합니다. 둘 다 없으면 전체가 1페이지입니다.
fn split_text_pages(text: &str) -> Vec<String> {
    if text.contains('\x0c') {
        let mut pages: Vec<String> = text.split('\x0c').map(|s| s.trim().to_string()).collect();

        // 마지막 폼피드 뒤의 빈 꼬리는 페이지가 아님
        while pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
            pages.pop();
        }
        return pages;
    }

    let page_pattern = match regex::Regex::new(
        r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$",
    ) {
        Ok(re) => re,
        Err(_) => return vec![text.trim().to_string()],
    };

    if page_pattern.is_match(text) {
        let pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    vec![text.trim().to_string()]
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pages_numbers_from_one() {
        let doc = Document::from_pages("mem", ["a", "b"]);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.pages[1].number, 2);
        assert_eq!(doc.total_chars(), 2);
    }

    #[test]
    fn test_total_chars_counts_unicode() {
        let doc = Document::from_pages("mem", ["클라우드"]);
        assert_eq!(doc.total_chars(), 4);
    }

    #[test]
    fn test_split_text_pages_with_formfeed() {
        let pages = split_text_pages("Page 1 content\x0cPage 2 content\x0cPage 3 content");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "Page 1 content");
        assert_eq!(pages[2], "Page 3 content");
    }

    #[test]
    fn test_split_text_pages_keeps_empty_middle_page() {
        let pages = split_text_pages("first\x0c\x0cthird\x0c");
        assert_eq!(pages, vec!["first", "", "third"]);
    }

    #[test]
    fn test_split_text_pages_with_marker_lines() {
        let pages = split_text_pages("intro text\n--- Page 2 ---\nsecond page text");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], "second page text");
    }

    #[test]
    fn test_split_text_pages_no_separator() {
        assert_eq!(split_text_pages("Just some text without page breaks").len(), 1);
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("aws-overview.pdf")));
        assert!(is_pdf(Path::new("REPORT.PDF")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let result = load_document(Path::new("/no/such/aws-overview.pdf")).await;
        assert!(matches!(result, Err(QaError::DocumentLoad(_))));
    }

    #[tokio::test]
    async fn test_load_text_document_with_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "page one\x0cpage two").unwrap();

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].text, "page two");
        assert!(!doc.is_blank());
    }

    #[tokio::test]
    async fn test_load_pdf_numbers_pages_and_segments() {
        use crate::knowledge::{Chunker, FixedWindowChunker};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aws-overview.pdf");
        pdf::write_test_pdf(&path, &["Alpha page one text", "Bravo page two text"]);

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].number, 2);
        assert!(doc.pages[0].text.contains("Alpha"));
        assert!(doc.pages[1].text.contains("Bravo"));

        let segments = FixedWindowChunker::with_defaults().split(&doc);
        let source_pages: Vec<usize> = segments.iter().map(|s| s.source_page).collect();
        assert_eq!(source_pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_blank_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanned.pdf");
        pdf::write_test_pdf(&path, &["", ""]);

        let result = load_document(&path).await;
        assert!(matches!(result, Err(QaError::DocumentLoad(_))));
    }

    #[tokio::test]
    async fn test_load_corrupt_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let result = load_document(&path).await;
        assert!(matches!(result, Err(QaError::DocumentLoad(_))));
    }
}
