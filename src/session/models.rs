use crate::doc_processor::FileKind;
use crate::llm::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationRole {
    User,
    Assistant,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationRole::User => "user",
            ConversationRole::Assistant => "assistant",
        }
    }

    /// The provider calls the assistant side `model`.
    pub fn wire_role(&self) -> Role {
        match self {
            ConversationRole::User => Role::User,
            ConversationRole::Assistant => Role::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Upload { filename: String, kind: FileKind },
    Pasted,
}

/// The session's document. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    source: DocumentSource,
    char_budget: usize,
}

impl Document {
    pub fn new(text: impl Into<String>, source: DocumentSource, char_budget: usize) -> Self {
        Document {
            text: text.into(),
            source,
            char_budget,
        }
    }

    pub fn pasted(text: &str, char_budget: usize) -> Self {
        Document::new(text.trim(), DocumentSource::Pasted, char_budget)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Maximum number of characters sent to the model.
    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_truncated(&self) -> bool {
        self.char_count() > self.char_budget
    }

    pub fn label(&self) -> &str {
        match &self.source {
            DocumentSource::Upload { filename, .. } => filename,
            DocumentSource::Pasted => "pasted text",
        }
    }
}
