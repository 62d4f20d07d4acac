pub mod extract;
pub mod gemini;

use serde::{Deserialize, Serialize};

/// Role names understood by the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One text segment of a turn. Responses may omit `text` (e.g. function
/// call parts), so it stays optional on the way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn turn(role: Role, text: impl Into<String>) -> Self {
        Content {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Content without a role, as used for `systemInstruction`.
    pub fn instruction(text: impl Into<String>) -> Self {
        Content {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

/// Body of a `generateContent` / `streamGenerateContent` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl GenerationRequest {
    pub fn single_turn(text: impl Into<String>) -> Self {
        GenerationRequest {
            contents: vec![Content::turn(Role::User, text)],
            system_instruction: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

/// Typed view of a successful response payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// A response payload in whichever shape it could be read.
///
/// Payloads that match the typed schema are kept `Structured`; anything
/// else that is still valid JSON is kept as a `Raw` mapping and walked by
/// key during extraction.
#[derive(Debug, Clone)]
pub enum GenerationResponse {
    Structured(GenerateContentResponse),
    Raw(serde_json::Value),
}

impl GenerationResponse {
    pub fn from_json(body: &str) -> Result<Self, LlmError> {
        match serde_json::from_str::<GenerateContentResponse>(body) {
            Ok(response) => Ok(GenerationResponse::Structured(response)),
            Err(_) => serde_json::from_str::<serde_json::Value>(body)
                .map(GenerationResponse::Raw)
                .map_err(|e| LlmError::Parse(e.to_string())),
        }
    }

    pub fn from_value(value: serde_json::Value) -> Self {
        match GenerateContentResponse::deserialize(&value) {
            Ok(response) => GenerationResponse::Structured(response),
            Err(_) => GenerationResponse::Raw(value),
        }
    }
}

/// One display update from a generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: String,
    pub done: bool,
    /// The stream failed and a batch answer follows; drop what was shown.
    pub restart: bool,
}

impl StreamChunk {
    pub fn delta(delta: impl Into<String>) -> Self {
        StreamChunk {
            delta: delta.into(),
            ..Default::default()
        }
    }

    pub fn done() -> Self {
        StreamChunk {
            done: true,
            ..Default::default()
        }
    }

    pub fn restart() -> Self {
        StreamChunk {
            restart: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("API error: {status} {reason} - {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for LlmError {
    /// The API key travels in the query string, so the URL never goes into
    /// an error.
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}
