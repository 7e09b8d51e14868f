//! 프롬프트 템플릿
//!
//! 1. 질문 재구성: 이전 대화 + 후속 질문 → 독립적인 검색 질문
//! 2. 답변 생성: 지시사항 + 검색된 문서 내용(페이지 표시) + 원래 질문

use crate::knowledge::SearchResult;

use super::ConversationTurn;

/// 대화 기록을 `Human:` / `Assistant:` 줄로 렌더링
pub fn format_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("Human: {}\nAssistant: {}", t.question, t.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 검색 결과를 페이지 번호가 붙은 컨텍스트 블록으로 렌더링
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("[Page {}]\n{}", r.segment.source_page, r.segment.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 질문 재구성 프롬프트
pub fn condense_prompt(turns: &[ConversationTurn], question: &str) -> String {
    let chat_history = format_history(turns);

    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:"
    )
}

/// 근거 기반 답변 프롬프트
///
/// 문서 내용만으로 답하고, 모르면 모른다고 말하며,
/// 마지막에 근거 원문과 페이지 번호를 정리하도록 지시합니다.
pub fn answer_prompt(results: &[SearchResult], question: &str) -> String {
    let context = format_context(results);

    format!(
        "Answer the question using only the document content below. If the content does not \
contain the answer, say \"I don't know\". Do not try to make up an answer.

Relevant document content:
{context}

Question: {question}

At the end of your answer, neatly list the exact document excerpts that support your answer, \
each with its page number.

Answer:"
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Segment;

    fn result(page: usize, text: &str) -> SearchResult {
        SearchResult {
            segment: Segment {
                index: 0,
                text: text.to_string(),
                source_page: page,
                offset: 0,
            },
            similarity: 0.5,
        }
    }

    #[test]
    fn test_format_history() {
        let turns = vec![
            ConversationTurn::new("What is AWS?", "A cloud platform."),
            ConversationTurn::new("Is it global?", "Yes."),
        ];
        assert_eq!(
            format_history(&turns),
            "Human: What is AWS?\nAssistant: A cloud platform.\nHuman: Is it global?\nAssistant: Yes."
        );
        assert_eq!(format_history(&[]), "");
    }

    #[test]
    fn test_format_context_labels_pages() {
        let ctx = format_context(&[result(3, " EC2 overview "), result(7, "S3 overview")]);
        assert_eq!(ctx, "[Page 3]\nEC2 overview\n\n[Page 7]\nS3 overview");
    }

    #[test]
    fn test_answer_prompt_contents() {
        let prompt = answer_prompt(&[result(2, "Lambda runs code")], "What is Lambda?");
        assert!(prompt.contains("I don't know"));
        assert!(prompt.contains("[Page 2]\nLambda runs code"));
        assert!(prompt.contains("Question: What is Lambda?"));
        assert!(prompt.contains("page number"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }

    #[test]
    fn test_answer_prompt_braces_are_literal() {
        // 문서나 질문에 중괄호가 있어도 치환되지 않아야 함
        let prompt = answer_prompt(&[result(1, "{question}")], "what is {context}?");
        assert!(prompt.contains("[Page 1]\n{question}"));
        assert!(prompt.contains("Question: what is {context}?"));
    }

    #[test]
    fn test_condense_prompt_contents() {
        let turns = vec![ConversationTurn::new("What is S3?", "Object storage.")];
        let prompt = condense_prompt(&turns, "How much does it cost?");
        assert!(prompt.contains("Human: What is S3?"));
        assert!(prompt.contains("Follow Up Input: How much does it cost?"));
        assert!(prompt.ends_with("Standalone question:"));
    }
}
