//! Turning provider payloads into display text.
//!
//! Extraction is total: a missing candidate, content or part list yields an
//! empty string, never an error.

use super::{GenerateContentResponse, GenerationResponse, LlmError};
use futures::{Stream, StreamExt};
use serde_json::Value;

/// Concatenate the text parts of the first candidate.
pub fn extract_text(response: &GenerationResponse) -> String {
    match response {
        GenerationResponse::Structured(response) => structured_text(response),
        GenerationResponse::Raw(value) => raw_text(value),
    }
}

fn structured_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

fn raw_text(value: &Value) -> String {
    value
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

/// Map a stream of response events to the text fragments they carry.
///
/// Events without text are skipped, so each event produces zero or one
/// fragment. Errors are passed through unchanged.
pub fn text_increments<S>(events: S) -> impl Stream<Item = Result<String, LlmError>>
where
    S: Stream<Item = Result<GenerationResponse, LlmError>>,
{
    events.filter_map(|event| async move {
        match event {
            Ok(response) => {
                let text = extract_text(&response);
                (!text.is_empty()).then_some(Ok(text))
            }
            Err(e) => Some(Err(e)),
        }
    })
}
