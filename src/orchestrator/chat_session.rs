//! Per-surface chat state: lazy session creation, optimistic user messages,
//! and assistant replies merged in arrival order.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::dto::SessionDto;
use crate::api::envelope::ApiError;
use crate::models::internal::{ChatAssistant, ChatMessage, ChatSession, ReferenceChunk};
use crate::services::completion_client::CompletionClient;
use crate::services::rag_client::{CompletionAnswer, RagClient};

pub const DEFAULT_SESSION_NAME: &str = "new session";
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't process your message. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("No chat session is active")]
    NotActive,
    #[error("No chat assistant is available for this book")]
    Unavailable,
    #[error("Session {0} has no chat assistant")]
    MissingAssistant(String),
}

/// Remote operations the reconciler needs
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn find_assistant_for(&self, book_name: &str) -> Result<Option<ChatAssistant>, ApiError>;
    async fn create_session(
        &self,
        chat_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<SessionDto, ApiError>;
    async fn send_completion(
        &self,
        chat_id: &str,
        question: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<CompletionAnswer, ApiError>;
    async fn rename_session(
        &self,
        chat_id: &str,
        session_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<(), ApiError>;
}

/// Short title for a new session. Implementations never fail; they fall back.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn session_title(&self, first_message: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantTarget {
    Id(String),
    BookName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Closed,
    Initializing,
    Active { chat_id: String, session_id: String },
    /// No assistant serves this book; the UI shows its "not available" path
    Unavailable,
}

pub struct ChatSessionReconciler {
    backend: Arc<dyn ChatBackend>,
    titles: Option<Arc<dyn TitleGenerator>>,
    user_id: String,
    state: ChatState,
    messages: Vec<ChatMessage>,
    seq: u64,
    /// Set when this reconciler created the session, so its first question names it
    fresh_session: bool,
    titled: bool,
}

impl ChatSessionReconciler {
    pub fn new(backend: Arc<dyn ChatBackend>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            titles: None,
            user_id: user_id.into(),
            state: ChatState::Closed,
            messages: Vec::new(),
            seq: 0,
            fresh_session: false,
            titled: false,
        }
    }

    pub fn with_title_generator(mut self, titles: Arc<dyn TitleGenerator>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            ChatState::Active { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    /// Opens the surface, creating a session on the first open only.
    ///
    /// A book with no matching assistant ends in [`ChatState::Unavailable`],
    /// which is not an error. A failed create leaves the surface closed.
    pub async fn open(&mut self, target: AssistantTarget) -> Result<&ChatState, ChatError> {
        if matches!(self.state, ChatState::Active { .. } | ChatState::Initializing) {
            return Ok(&self.state);
        }
        self.state = ChatState::Initializing;

        let chat_id = match target {
            AssistantTarget::Id(id) => id,
            AssistantTarget::BookName(name) => {
                match self.backend.find_assistant_for(&name).await {
                    Ok(Some(assistant)) => assistant.id,
                    Ok(None) => {
                        info!("No chat assistant for book {}", name);
                        self.state = ChatState::Unavailable;
                        return Ok(&self.state);
                    }
                    Err(e) => {
                        self.state = ChatState::Closed;
                        return Err(e.into());
                    }
                }
            }
        };

        let created = match self
            .backend
            .create_session(&chat_id, DEFAULT_SESSION_NAME, &self.user_id)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                warn!("Failed to create chat session: {}", e);
                self.state = ChatState::Closed;
                return Err(e.into());
            }
        };
        debug!("Created session {} for chat {}", created.id, chat_id);

        let greeting = created
            .messages
            .iter()
            .find(|m| m.role != "user" && !m.content.is_empty())
            .map(|m| m.content.clone());

        self.messages.clear();
        self.seq = 0;
        self.state = ChatState::Active {
            chat_id,
            session_id: created.id,
        };
        self.fresh_session = true;
        self.titled = false;

        if let Some(content) = greeting {
            self.push(content, false, Vec::new());
        }
        Ok(&self.state)
    }

    /// Re-enters an existing session (history screen) without creating one
    pub fn resume(&mut self, session: ChatSession) -> Result<(), ChatError> {
        let chat_id = session
            .chat_id
            .clone()
            .ok_or_else(|| ChatError::MissingAssistant(session.id.clone()))?;

        self.messages = session.messages;
        self.seq = self.messages.len() as u64;
        self.state = ChatState::Active {
            chat_id,
            session_id: session.id,
        };
        self.fresh_session = false;
        self.titled = false;
        Ok(())
    }

    /// Appends the user message, asks the assistant, appends the reply.
    ///
    /// A failed completion becomes an apology message in the conversation,
    /// not an error. Blank input is ignored.
    pub async fn send(&mut self, text: &str) -> Result<Option<&ChatMessage>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let (chat_id, session_id) = match &self.state {
            ChatState::Active {
                chat_id,
                session_id,
            } => (chat_id.clone(), session_id.clone()),
            ChatState::Unavailable => return Err(ChatError::Unavailable),
            _ => return Err(ChatError::NotActive),
        };

        self.push(text.to_string(), true, Vec::new());
        let names_session = self.fresh_session
            && !self.titled
            && self.messages.iter().filter(|m| m.is_user).count() == 1;

        match self
            .backend
            .send_completion(&chat_id, text, &session_id, &self.user_id)
            .await
        {
            Ok(answer) => self.push(answer.answer, false, answer.references),
            Err(e) => {
                warn!("Send failed in session {}: {}", session_id, e);
                self.push(APOLOGY_MESSAGE.to_string(), false, Vec::new());
            }
        }

        if names_session {
            self.titled = true;
            self.name_session(&chat_id, &session_id, text).await;
        }

        Ok(self.messages.last())
    }

    /// Drops every local message and the session link
    pub fn close(&mut self) {
        self.messages.clear();
        self.state = ChatState::Closed;
        self.seq = 0;
        self.fresh_session = false;
        self.titled = false;
    }

    async fn name_session(&self, chat_id: &str, session_id: &str, first_message: &str) {
        let title = match &self.titles {
            Some(titles) => titles.session_title(first_message).await,
            None => first_message.to_string(),
        };
        if let Err(e) = self
            .backend
            .rename_session(chat_id, session_id, &title, &self.user_id)
            .await
        {
            warn!("Failed to rename session {}: {}", session_id, e);
        }
    }

    fn push(&mut self, content: String, is_user: bool, references: Vec<ReferenceChunk>) {
        let id = self.next_message_id();
        self.messages.push(ChatMessage {
            id,
            content,
            is_user,
            timestamp: Utc::now(),
            references,
        });
    }

    /// Monotonic per-session counter plus a UUID, unique even within one millisecond
    fn next_message_id(&mut self) -> String {
        self.seq += 1;
        let scope = self.session_id().unwrap_or("local").to_string();
        format!("{}-{}-{}", scope, self.seq, Uuid::new_v4().simple())
    }
}

#[async_trait]
impl ChatBackend for RagClient {
    async fn find_assistant_for(&self, book_name: &str) -> Result<Option<ChatAssistant>, ApiError> {
        RagClient::find_assistant_for(self, book_name).await
    }

    async fn create_session(
        &self,
        chat_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<SessionDto, ApiError> {
        RagClient::create_session(self, chat_id, name, user_id).await
    }

    async fn send_completion(
        &self,
        chat_id: &str,
        question: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<CompletionAnswer, ApiError> {
        RagClient::send_completion(self, chat_id, question, Some(session_id), user_id).await
    }

    async fn rename_session(
        &self,
        chat_id: &str,
        session_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        RagClient::rename_session(self, chat_id, session_id, name, user_id).await
    }
}

#[async_trait]
impl TitleGenerator for CompletionClient {
    async fn session_title(&self, first_message: &str) -> String {
        self.generate_session_title(first_message).await
    }
}
