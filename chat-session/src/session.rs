//! Per-session state owned by the host and filled by the bootstrapper.

use std::fmt;
use std::sync::Arc;

use rag_store::EnsembleRetriever;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// State of one user session.
///
/// The id and the retriever are set lazily by
/// [`Bootstrapper::initialize`](crate::Bootstrapper::initialize) and never
/// replaced afterwards. The chat history is append-only.
#[derive(Debug, Default)]
pub struct SessionContext {
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
    retriever: Option<Arc<EnsembleRetriever>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the id, generating a random 32-hex-digit one on first use.
    pub fn ensure_session_id(&mut self) -> &str {
        self.session_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn retriever(&self) -> Option<&Arc<EnsembleRetriever>> {
        self.retriever.as_ref()
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Stores the retriever unless one is already present.
    /// Returns whether `retriever` was stored.
    pub fn set_retriever(&mut self, retriever: Arc<EnsembleRetriever>) -> bool {
        if self.retriever.is_some() {
            return false;
        }
        self.retriever = Some(retriever);
        true
    }

    /// Detaches the retriever, leaving the id and history in place.
    pub fn take_retriever(&mut self) -> Option<Arc<EnsembleRetriever>> {
        self.retriever.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_generated_once() {
        let mut ctx = SessionContext::new();
        assert!(ctx.session_id().is_none());

        let first = ctx.ensure_session_id().to_string();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ctx.ensure_session_id(), first);
    }

    #[test]
    fn ids_differ_between_sessions() {
        let a = SessionContext::new().ensure_session_id().to_string();
        let b = SessionContext::new().ensure_session_id().to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn history_keeps_order() {
        let mut ctx = SessionContext::new();
        ctx.push_message(ChatMessage::new(Role::User, "在庫はありますか"));
        ctx.push_message(ChatMessage::new(Role::Assistant, "あります"));
        let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }
}
