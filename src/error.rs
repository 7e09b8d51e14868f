//! 에러 타입
//!
//! 라이브러리 경계에서 반환되는 에러 분류입니다.
//! 프로바이더 내부는 `anyhow`를 사용하고, 세션 경계에서 `QaError`로 변환합니다.

use std::time::Duration;

use thiserror::Error;

/// pdf-qa 에러
#[derive(Debug, Error)]
pub enum QaError {
    /// 설정 오류 (API 키 누락, 잘못된 청크/검색 설정)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 문서 로드 실패 (파일 없음, 텍스트 추출 실패)
    #[error("document load error: {0}")]
    DocumentLoad(String),

    /// 임베딩/생성 서비스 호출 실패
    #[error("service error: {0}")]
    Service(String),

    /// 지식베이스가 초기화되지 않음
    #[error("knowledge base is not initialized")]
    NotInitialized,

    /// 이미 다른 질문을 처리 중
    #[error("another question is already being answered")]
    Busy,

    /// 요청 시간 초과
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// 빈 질문 등 잘못된 입력
    #[error("invalid question: {0}")]
    InvalidQuestion(String),
}

impl QaError {
    /// anyhow 에러를 서비스 에러로 변환 (원인 체인 포함)
    pub fn service(err: anyhow::Error) -> Self {
        Self::Service(format!("{:#}", err))
    }

    /// 세션 초기화를 막는 치명적 에러 여부
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DocumentLoad(_))
    }
}

/// pdf-qa 결과 타입
pub type Result<T> = std::result::Result<T, QaError>;
