//! 설정 모듈
//!
//! 세션 하나를 구성하는 모든 값입니다. CLI 인자와 환경변수로 채워지며,
//! 지정되지 않은 값은 아래 상수를 기본값으로 사용합니다.

use std::path::PathBuf;
use std::time::Duration;

use crate::embedding::DEFAULT_EMBEDDING_MODEL;
use crate::error::{QaError, Result};
use crate::generation::DEFAULT_CHAT_MODEL;
use crate::knowledge::{ChunkConfig, DistanceMetric, DEFAULT_TOP_K};
use crate::openai::{RetryPolicy, DEFAULT_API_BASE};

/// 기본 문서 경로 (작업 디렉토리 기준)
pub const DEFAULT_DOCUMENT_PATH: &str = "aws-overview.pdf";

/// 기본 생성 온도
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// HTTP 요청 당 타임아웃 (초)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// 질문 하나의 전체 처리 기한 (초)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// 세션 설정
#[derive(Debug, Clone)]
pub struct QaConfig {
    /// 질의 대상 문서
    pub document_path: PathBuf,
    /// 청킹 설정
    pub chunk: ChunkConfig,
    /// 검색 개수
    pub top_k: usize,
    /// 인덱스 유사도 방식
    pub metric: DistanceMetric,
    /// 생성 온도
    pub temperature: f32,
    /// 채팅 모델
    pub chat_model: String,
    /// 임베딩 모델
    pub embedding_model: String,
    /// OpenAI 호환 API 기본 URL
    pub api_base: String,
    /// HTTP 요청 당 타임아웃
    pub http_timeout: Duration,
    /// 질문 하나의 처리 기한 (None이면 무제한)
    pub request_timeout: Option<Duration>,
    /// 재시도 정책
    pub retry: RetryPolicy,
    /// 답변 최대 토큰 (None이면 서비스 기본값)
    pub max_tokens: Option<u32>,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from(DEFAULT_DOCUMENT_PATH),
            chunk: ChunkConfig::default(),
            top_k: DEFAULT_TOP_K,
            metric: DistanceMetric::default(),
            temperature: DEFAULT_TEMPERATURE,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            retry: RetryPolicy::default(),
            max_tokens: None,
        }
    }
}

impl QaConfig {
    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;

        if self.top_k == 0 {
            return Err(QaError::Configuration(
                "top_k must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(QaError::Configuration(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.chat_model.trim().is_empty() || self.embedding_model.trim().is_empty() {
            return Err(QaError::Configuration(
                "model names must not be empty".to_string(),
            ));
        }

        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(QaError::Configuration(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(QaError::Configuration(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(QaError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QaConfig::default();
        assert_eq!(config.document_path, PathBuf::from("aws-overview.pdf"));
        assert_eq!(config.chunk.chunk_size, 1000);
        assert_eq!(config.chunk.chunk_overlap, 200);
        assert_eq!(config.top_k, 4);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.chat_model, "gpt-4-0125-preview");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_k = QaConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(bad_k.validate(), Err(QaError::Configuration(_))));

        let bad_tokens = QaConfig {
            max_tokens: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            bad_tokens.validate(),
            Err(QaError::Configuration(_))
        ));

        let bad_temp = QaConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(bad_temp.validate().is_err());

        let bad_chunk = QaConfig {
            chunk: ChunkConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            },
            ..Default::default()
        };
        assert!(bad_chunk.validate().is_err());

        let bad_url = QaConfig {
            api_base: "api.openai.com".to_string(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_deadline = QaConfig {
            request_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(zero_deadline.validate().is_err());
    }
}
