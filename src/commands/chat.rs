use crate::config::Settings;
use crate::error::AppError;
use crate::llm::{gemini, StreamChunk};
use crate::prompt;
use crate::session::Session;
use tracing::info;

/// Shown (and recorded) in place of an answer that carried no text.
pub const NO_CONTENT_PLACEHOLDER: &str = "_(The model returned no content.)_";

fn non_empty_answer(answer: String) -> String {
    if answer.trim().is_empty() {
        NO_CONTENT_PLACEHOLDER.to_string()
    } else {
        answer
    }
}

/// One-shot question about the session's document.
pub async fn ask(
    settings: &Settings,
    session: &mut Session,
    question: &str,
    on_chunk: impl FnMut(StreamChunk),
) -> Result<String, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::Input("Please enter a question.".into()));
    }
    let Some(document) = session.document() else {
        return Err(AppError::Input(
            "No document loaded. Upload a file or paste some text first.".into(),
        ));
    };
    if document.text().is_empty() {
        return Err(AppError::Input(format!(
            "`{}` contains no text to ask about.",
            document.label()
        )));
    }

    let request = prompt::build_request(document.text(), question, document.char_budget());
    info!(document = document.label(), "asking one-shot question");

    session.history_mut().push_user(question);
    let answer = gemini::generate_with_fallback(&settings.gemini(), &request, on_chunk).await?;
    let answer = non_empty_answer(answer);
    session.history_mut().push_assistant(answer.as_str());
    Ok(answer)
}

/// Append a user turn and get the assistant's reply to the recent history.
pub async fn send_message(
    settings: &Settings,
    session: &mut Session,
    content: &str,
    on_chunk: impl FnMut(StreamChunk),
) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Input("Please enter a message.".into()));
    }

    // 1. Record the user turn
    session.history_mut().push_user(content);

    // 2. Serialize the recent history, with the document as context
    let document = session.document();
    let request = prompt::build_chat_request(
        session.history(),
        document.map(|d| d.text()),
        document.map_or(settings.char_budget, |d| d.char_budget()),
        settings.history_window,
    );
    info!(turns = request.contents.len(), "sending chat message");

    // 3. Stream the reply
    let answer = gemini::generate_with_fallback(&settings.gemini(), &request, on_chunk).await?;

    // 4. Record the assistant turn
    let answer = non_empty_answer(answer);
    session.history_mut().push_assistant(answer.as_str());
    Ok(answer)
}
