pub mod models;

use models::{ConversationRole, ConversationTurn, Document};
use tracing::debug;
use uuid::Uuid;

/// Append-only, ordered list of turns for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ConversationRole, content: impl Into<String>) -> &ConversationTurn {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
        });
        debug!(role = role.as_str(), turns = self.turns.len(), "turn appended");
        &self.turns[self.turns.len() - 1]
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &ConversationTurn {
        self.push(ConversationRole::User, content)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &ConversationTurn {
        self.push(ConversationRole::Assistant, content)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Everything one interactive session holds: at most one document and the
/// conversation so far.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    document: Option<Document>,
    history: ConversationHistory,
}

impl Session {
    pub fn new() -> Self {
        Session {
            id: Uuid::new_v4(),
            document: None,
            history: ConversationHistory::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Text of the current document, or `""` when none is loaded.
    pub fn document_text(&self) -> &str {
        self.document.as_ref().map(Document::text).unwrap_or_default()
    }

    pub fn replace_document(&mut self, document: Document) {
        debug!(source = document.label(), chars = document.char_count(), "document replaced");
        self.document = Some(document);
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
