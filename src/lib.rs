//! rag-reader - client layer for a RAG document reader

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::api::envelope::{ApiError, ApiOutcome};
pub use crate::auth::{AuthEvent, SupabaseAuth};
pub use crate::config::Config;
pub use crate::models::internal::{ChatMessage, ChatSession, Dataset, Document};
pub use crate::orchestrator::chat_session::{ChatBackend, ChatSessionReconciler, TitleGenerator};
pub use crate::orchestrator::study_aids::{StudyAidError, StudyAids};
pub use crate::services::completion_client::CompletionClient;
pub use crate::services::rag_client::RagClient;
pub use crate::services::resource_fetcher::ResourceFetcher;
pub use crate::storage::supabase::SupabaseClient;
