use crate::models::{HistoryMessage, TurnRole};
use crate::tools::ToolOutput;

/// One rendered message of the transcript. Turns are immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: TurnRole,
    content: String,
    structured_payload: Option<ToolOutput>,
}

impl Turn {
    fn user(content: String) -> Self {
        Self {
            role: TurnRole::User,
            content,
            structured_payload: None,
        }
    }

    fn assistant(content: String, structured_payload: Option<ToolOutput>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content,
            structured_payload,
        }
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn structured_payload(&self) -> Option<&ToolOutput> {
        self.structured_payload.as_ref()
    }

    fn to_history_message(&self) -> HistoryMessage {
        HistoryMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Chronological transcript. Turns only enter in (user, assistant) pairs, so
/// the length is always even.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_exchange(
        &mut self,
        query: impl Into<String>,
        verified_output: impl Into<String>,
        structured_payload: Option<ToolOutput>,
    ) {
        let user = Turn::user(query.into());
        let assistant = Turn::assistant(verified_output.into(), structured_payload);
        self.turns.reserve(2);
        self.turns.push(user);
        self.turns.push(assistant);
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn exchange_count(&self) -> usize {
        self.turns.len() / 2
    }

    /// History in the outbound shape: role and content only.
    pub fn outbound_history(&self) -> Vec<HistoryMessage> {
        self.turns.iter().map(Turn::to_history_message).collect()
    }
}
