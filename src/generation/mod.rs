//! 답변 생성 모듈 - OpenAI Chat Completions API
//!
//! 완성된 프롬프트 하나를 단일 사용자 메시지로 보내고 응답 텍스트를 돌려받습니다.
//! 질문 재구성과 최종 답변 생성 모두 이 인터페이스를 사용합니다.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::openai::OpenAiClient;

// ============================================================================
// GenerationProvider Trait
// ============================================================================

/// 텍스트 생성 프로바이더 트레이트
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// 기본 채팅 모델
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-0125-preview";

/// OpenAI 채팅 생성 구현체
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiChat {
    /// 새 인스턴스 생성
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: None,
        }
    }

    /// 최대 출력 토큰 지정
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 응답에서 첫 번째 선택지의 텍스트 추출
fn extract_content(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Malformed chat response: no choices"))?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("Chat completion was truncated (finish_reason=length)");
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => anyhow::bail!("Malformed chat response: empty message content"),
    }
}

#[async_trait]
impl GenerationProvider for OpenAiChat {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            "Chat completion request (model={}, prompt_chars={}, temperature={})",
            self.model,
            prompt.chars().count(),
            temperature
        );

        let response: ChatResponse = self
            .client
            .post_json("chat/completions", &request)
            .await
            .context("Chat completion request failed")?;

        extract_content(response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
