//! Request construction for one-shot questions and for chat.

use crate::llm::{Content, GenerationRequest};
use crate::session::ConversationHistory;

/// Characters of document text sent with a request.
pub const DEFAULT_CHAR_BUDGET: usize = 120_000;
/// Turns of chat history sent with a request.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// The first `budget` characters of `text`. Never splits a character.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn qa_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant that answers questions about the document below.\n\
         Answer concisely and only from the document. If the document does not \
         contain the answer, say so.\n\
         After the answer, add a \"Sources\" section listing the sentences from \
         the document that support it as quoted bullet points.\n\
         \n\
         [Document]\n\
         {context}\n\
         \n\
         [Question]\n\
         {question}\n"
    )
}

fn chat_instruction(context: &str) -> String {
    format!(
        "You are a helpful assistant. The user has shared the document below; \
         use it when answering and quote it where it supports your answer.\n\
         \n\
         [Document]\n\
         {context}\n"
    )
}

/// One user turn holding the instruction template, the truncated document
/// and the verbatim question.
pub fn build_request(document_text: &str, question: &str, char_budget: usize) -> GenerationRequest {
    let context = truncate_chars(document_text, char_budget);
    GenerationRequest::single_turn(qa_prompt(context, question))
}

/// The most recent `window` turns of `history`, in order. A document, when
/// present, travels as the system instruction so `contents` holds only turns.
pub fn build_chat_request(
    history: &ConversationHistory,
    document_text: Option<&str>,
    char_budget: usize,
    window: usize,
) -> GenerationRequest {
    let contents = history
        .recent(window)
        .iter()
        .filter(|turn| !turn.content.is_empty())
        .map(|turn| Content::turn(turn.role.wire_role(), turn.content.as_str()))
        .collect();

    let system_instruction = document_text
        .filter(|text| !text.is_empty())
        .map(|text| Content::instruction(chat_instruction(truncate_chars(text, char_budget))));

    GenerationRequest {
        contents,
        system_instruction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Part, Role};

    fn prompt_text(request: &GenerationRequest) -> &str {
        request.contents[0].parts[0].text.as_deref().unwrap()
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ab", 10), "ab");
        assert_eq!(truncate_chars("", 10), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
        assert_eq!(truncate_chars("aé日🎉z", 4), "aé日🎉");
    }

    #[test]
    fn test_build_request_embeds_text_and_question() {
        let request = build_request("Hello world", "What is this?", DEFAULT_CHAR_BUDGET);
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, Some(Role::User));
        assert!(request.system_instruction.is_none());

        let prompt = prompt_text(&request);
        assert!(prompt.contains("Hello world"));
        assert!(prompt.contains("What is this?"));
        assert!(prompt.contains("Sources"));
    }

    #[test]
    fn test_build_request_embeds_exact_prefix() {
        let document = "0123456789".repeat(5);
        let request = build_request(&document, "q", 25);
        let prompt = prompt_text(&request);

        let expected = format!("[Document]\n{}\n\n[Question]", &document[..25]);
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&document[..26]));
    }

    #[test]
    fn test_chat_request_windows_history() {
        let mut history = ConversationHistory::new();
        for i in 0..25 {
            if i % 2 == 0 {
                history.push_user(format!("q{}", i));
            } else {
                history.push_assistant(format!("a{}", i));
            }
        }

        let request = build_chat_request(&history, None, DEFAULT_CHAR_BUDGET, DEFAULT_HISTORY_WINDOW);
        assert_eq!(request.contents.len(), 20);
        assert_eq!(request.contents[0].parts, vec![Part::text("a5")]);
        assert_eq!(request.contents[0].role, Some(Role::Model));
        assert_eq!(request.contents[19].parts, vec![Part::text("q24")]);
        assert_eq!(request.contents[19].role, Some(Role::User));
    }

    #[test]
    fn test_chat_request_carries_document_as_instruction() {
        let mut history = ConversationHistory::new();
        history.push_user("What is this?");

        let request = build_chat_request(&history, Some("Hello world and more"), 11, 20);
        let instruction = request.system_instruction.unwrap();
        assert_eq!(instruction.role, None);
        let text = instruction.parts[0].text.as_deref().unwrap();
        assert!(text.contains("Hello world"));
        assert!(!text.contains("and more"));
        assert_eq!(request.contents.len(), 1);
    }
}
