//! OpenAI 호환 API 공통 클라이언트
//!
//! 임베딩(`/embeddings`)과 답변 생성(`/chat/completions`)이 같은
//! 인증/재시도 규칙을 쓰도록 HTTP 호출을 한곳에 모았습니다.
//!
//! - 인증: `Authorization: Bearer <OPENAI_API_KEY>`
//! - 재시도: 429, 5xx, 전송 실패 시 지수 백오프

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::QaError;

/// 기본 API 엔드포인트
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// API 키 환경변수
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// 재시도 기본값
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

// ============================================================================
// Retry Policy
// ============================================================================

/// 재시도 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 재시도 횟수 (0이면 재시도 없음)
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간 (이후 2배씩 증가)
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// 재시도 없음
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// `attempt`번째 실패 후 대기 시간
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// 재시도할 만한 HTTP 상태인지 확인
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// `.env` 파일은 `main`에서 미리 로드되므로 여기서는 환경변수만 확인합니다.
pub fn get_api_key() -> crate::error::Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            Ok(key.trim().to_string())
        }
        _ => Err(QaError::Configuration(format!(
            "OpenAI API key not found. Set {} in the environment or in a .env file.",
            API_KEY_ENV
        ))),
    }
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Client
// ============================================================================

/// OpenAI 에러 응답
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// OpenAI 호환 HTTP 클라이언트
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl OpenAiClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `api_key` - Bearer 토큰
    /// * `base_url` - API 기본 URL (예: `https://api.openai.com/v1`)
    /// * `timeout` - 요청 당 타임아웃
    /// * `retry` - 재시도 정책
    pub fn new(
        api_key: String,
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("API key must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }

    /// 경로에 대한 전체 URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// JSON POST 요청 (재시도 포함)
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let backoff = self.retry.backoff(attempt - 1);
                tracing::warn!(
                    "Retrying {} in {:?} (attempt {}/{})",
                    path,
                    backoff,
                    attempt,
                    self.retry.max_retries
                );
                tokio::time::sleep(backoff).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send request to {}: {}", path, e));
                    continue;
                }
            };

            let status = response.status();
            let text = response
                .text()
                .await
                .context("Failed to read response body")?;

            if status.is_success() {
                return serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse response from {}", path));
            }

            let err = describe_error(status, &text);
            if is_retryable_status(status) {
                last_error = Some(err);
                continue;
            }

            // 4xx (429 제외)는 즉시 실패
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("Request to {} failed after {} retries", path, self.retry.max_retries)
        }))
    }
}

/// HTTP 에러 응답을 사람이 읽을 수 있는 에러로 변환
fn describe_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api) => anyhow::anyhow!(
            "OpenAI API error ({}{}): {}",
            status,
            api.error
                .kind
                .map(|k| format!(", {}", k))
                .unwrap_or_default(),
            api.error.message
        ),
        Err(_) => anyhow::anyhow!("OpenAI API error ({}): {}", status, body),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> OpenAiClient {
        OpenAiClient::new(
            "sk-test".to_string(),
            base,
            Duration::from_secs(5),
            RetryPolicy::none(),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        assert_eq!(
            client("https://api.openai.com/v1/").endpoint("/embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            client("http://localhost:8080/v1").endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiClient::new(
            "  ".to_string(),
            DEFAULT_API_BASE,
            Duration::from_secs(5),
            RetryPolicy::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", client(DEFAULT_API_BASE));
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_retryable_status() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(2000));
        assert_eq!(policy.backoff(1), Duration::from_millis(4000));
        assert_eq!(policy.backoff(2), Duration::from_millis(8000));
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_describe_error_parses_api_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let msg = describe_error(StatusCode::UNAUTHORIZED, body).to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid_request_error"));
        assert!(msg.contains("Incorrect API key provided"));

        let raw = describe_error(StatusCode::BAD_GATEWAY, "upstream down").to_string();
        assert!(raw.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        // 닫힌 포트로 요청하면 재시도 없이 에러가 반환되어야 함
        let client = client("http://127.0.0.1:9");
        let result: Result<serde_json::Value> =
            client.post_json("embeddings", &serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
