//! 대화 세션
//!
//! 질문 하나를 처리하는 흐름:
//! 1. 이전 대화가 있으면 후속 질문을 독립적인 검색 질문으로 재구성
//! 2. 재구성된 질문으로 상위 k개 세그먼트 검색
//! 3. 근거 기반 답변 프롬프트 구성
//! 4. 답변 생성
//! 5. 성공했을 때만 (질문, 답변) 턴을 기록에 추가
//!
//! 한 세션은 한 번에 질문 하나만 처리합니다. 처리 중에 들어온 질문은
//! 대기시키지 않고 즉시 `QaError::Busy`로 거절합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::QaConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};
use crate::generation::GenerationProvider;
use crate::knowledge::{IndexStats, KnowledgeIndex, KnowledgeLoader, Retriever, SearchResult};

use super::prompt::{answer_prompt, condense_prompt};
use super::{ConversationState, ConversationTurn};

/// 세션 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 처리 중인 질문 없음
    Idle,
    /// 질문 하나를 처리 중
    Answering,
}

/// 질문 처리 결과
#[derive(Debug, Clone)]
pub struct Answer {
    /// 생성된 답변
    pub text: String,
    /// 검색에 사용한 독립 질문 (대화 기록이 없으면 원래 질문)
    pub standalone_question: String,
    /// 답변 근거로 사용한 세그먼트
    pub sources: Vec<SearchResult>,
}

/// 대화 세션
pub struct ChatSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: QaConfig,
    loader: KnowledgeLoader,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    history: Mutex<ConversationState>,
}

impl ChatSession {
    /// 세션 생성
    ///
    /// 설정을 검증하고 빈 대화 기록으로 시작합니다. 문서는 아직 읽지 않습니다.
    pub fn create(
        config: QaConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let loader = KnowledgeLoader::new(
            config.document_path.clone(),
            config.chunk,
            config.metric,
            embedder.clone(),
        );

        let session = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            config,
            loader,
            embedder,
            generator,
            history: Mutex::new(ConversationState::new()),
        };

        tracing::info!(
            "Created chat session {} (document={}, embedder={}, generator={})",
            session.id,
            session.config.document_path.display(),
            session.embedder.name(),
            session.generator.name()
        );

        Ok(session)
    }

    /// 세션 종료
    ///
    /// 세션을 소비하고 대화 기록을 돌려줍니다.
    pub fn destroy(self) -> ConversationState {
        let history = self.history.into_inner();
        tracing::info!(
            "Destroyed chat session {} (turns={}, age={}s)",
            self.id,
            history.len(),
            (Utc::now() - self.created_at).num_seconds()
        );
        history
    }

    /// 세션 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 세션 설정
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// 지식베이스 초기화 (이미 초기화되었으면 캐시 사용)
    ///
    /// 실패해도 세션은 그대로 사용할 수 있으며, 다시 호출하면 재시도합니다.
    pub async fn initialize(&self) -> Result<IndexStats> {
        let index = self.loader.initialize().await?;
        Ok(index.stats())
    }

    /// 지식베이스 초기화 여부
    pub fn is_initialized(&self) -> bool {
        self.loader.is_initialized()
    }

    /// 캐시된 지식베이스 폐기 (다음 `initialize()`에서 재구축)
    pub fn reset(&mut self) {
        self.loader.reset();
    }

    /// 현재 처리 상태
    pub fn state(&self) -> SessionState {
        match self.history.try_lock() {
            Ok(_) => SessionState::Idle,
            Err(_) => SessionState::Answering,
        }
    }

    /// 대화 기록 스냅샷 (오래된 순)
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().await.turns().to_vec()
    }

    /// 질문하기 (설정된 처리 기한 적용)
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_within(question, self.config.request_timeout).await
    }

    /// 기한을 지정하여 질문하기
    ///
    /// 기한이 지나면 진행 중인 요청을 중단하고 `QaError::Timeout`을 반환합니다.
    pub async fn ask_with_deadline(&self, question: &str, deadline: Duration) -> Result<Answer> {
        self.ask_within(question, Some(deadline)).await
    }

    /// 검색만 수행 (답변 생성 없음)
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let index = self.loader.get().ok_or(QaError::NotInitialized)?;
        self.retriever(&index)
            .retrieve(query, k)
            .await
            .map_err(QaError::service)
    }

    async fn ask_within(&self, question: &str, deadline: Option<Duration>) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::InvalidQuestion(
                "question must not be empty".to_string(),
            ));
        }

        let index = self.loader.get().ok_or(QaError::NotInitialized)?;

        // 잠금을 얻지 못하면 다른 질문이 처리 중 (Answering)
        let mut history = self.history.try_lock().map_err(|_| QaError::Busy)?;

        let turn = self.answer(&index, history.turns(), question);
        let answer = match deadline {
            Some(limit) => tokio::time::timeout(limit, turn).await.map_err(|_| {
                tracing::warn!("Question timed out after {:?} in session {}", limit, self.id);
                QaError::Timeout(limit)
            })??,
            None => turn.await?,
        };

        history.push(ConversationTurn::new(question, answer.text.clone()));

        tracing::info!(
            "Answered question in session {} (turns={}, sources={})",
            self.id,
            history.len(),
            answer.sources.len()
        );

        Ok(answer)
    }

    /// 질문 하나 처리 (기록은 건드리지 않음)
    async fn answer(
        &self,
        index: &KnowledgeIndex,
        turns: &[ConversationTurn],
        question: &str,
    ) -> Result<Answer> {
        let standalone_question = self.condense(turns, question).await?;

        let sources = self
            .retriever(index)
            .retrieve(&standalone_question, self.config.top_k)
            .await
            .map_err(QaError::service)?;

        let prompt = answer_prompt(&sources, question);
        let text = self
            .generator
            .generate(&prompt, self.config.temperature)
            .await
            .map_err(QaError::service)?;

        Ok(Answer {
            text: text.trim().to_string(),
            standalone_question,
            sources,
        })
    }

    /// 대화 기록을 반영하여 독립적인 검색 질문으로 재구성
    async fn condense(&self, turns: &[ConversationTurn], question: &str) -> Result<String> {
        if turns.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = condense_prompt(turns, question);
        let rewritten = self
            .generator
            .generate(&prompt, self.config.temperature)
            .await
            .map_err(QaError::service)?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            tracing::debug!("Condensed question was blank, using original question");
            return Ok(question.to_string());
        }

        tracing::debug!("Condensed question: {}", rewritten);
        Ok(rewritten.to_string())
    }

    fn retriever(&self, index: &KnowledgeIndex) -> Retriever {
        Retriever::new(index.store.clone(), self.embedder.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
