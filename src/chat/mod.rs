//! Chat 모듈 - 대화형 문서 QA
//!
//! - History: 질문/답변 턴 기록
//! - Prompt: 질문 재구성 및 근거 기반 답변 프롬프트
//! - Session: 대화 세션 (한 번에 질문 하나만 처리)

mod prompt;
mod session;

use chrono::{DateTime, Utc};

pub use prompt::{answer_prompt, condense_prompt, format_context, format_history};
pub use session::{Answer, ChatSession, SessionState};

// ============================================================================
// Conversation History
// ============================================================================

/// 대화 턴 (생성 후 변경되지 않음)
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    /// 사용자 질문 (원문)
    pub question: String,
    /// 생성된 답변
    pub answer: String,
    /// 답변 완료 시각
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// 새 턴 생성 (현재 시각)
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// 대화 기록 (도착 순서 유지, 추가만 가능)
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    /// 빈 기록 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 턴 추가
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// 모든 턴 (오래된 순)
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// 턴 수
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_arrival_order() {
        let mut history = ConversationState::new();
        assert!(history.is_empty());

        history.push(ConversationTurn::new("q1", "a1"));
        history.push(ConversationTurn::new("q2", "a2"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].question, "q1");
        assert_eq!(history.turns()[1].answer, "a2");
        assert!(history.turns()[0].asked_at <= history.turns()[1].asked_at);
    }
}
