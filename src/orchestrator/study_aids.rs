//! Read-through cache for generated summaries and quizzes.
//!
//! A lookup never generates. Generation runs only when asked, persists one
//! row, and returns what it stored.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::envelope::ApiError;
use crate::models::internal::{QuizSet, Summary};
use crate::services::completion_client::{CompletionClient, CompletionError};
use crate::services::rag_client::RagClient;
use crate::storage::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, thiserror::Error)]
pub enum StudyAidError {
    #[error("Storage error: {0}")]
    Store(#[from] SupabaseError),
    #[error("Generation error: {0}")]
    Generate(#[from] CompletionError),
    #[error("Source error: {0}")]
    Source(#[from] ApiError),
    #[error("Document {0} has no text to work from")]
    NoContent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// Nothing stored yet; the caller may offer to generate
    Missing,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

#[async_trait]
pub trait StudyAidStore: Send + Sync {
    async fn fetch_summary(&self, document_id: &str) -> Result<Summary, SupabaseError>;
    async fn insert_summary(&self, document_id: &str, summary: &str) -> Result<(), SupabaseError>;
    async fn fetch_quiz(&self, document_id: &str) -> Result<QuizSet, SupabaseError>;
    async fn insert_quiz(&self, document_id: &str, quiz: &QuizSet) -> Result<(), SupabaseError>;
}

#[async_trait]
pub trait StudyAidGenerator: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String, CompletionError>;
    async fn quiz(&self, content: &str) -> Result<QuizSet, CompletionError>;
}

/// Full text of a document, assembled from its chunks
#[async_trait]
pub trait ChunkSource: Send + Sync {
    async fn document_text(&self, dataset_id: &str, document_id: &str) -> Result<String, ApiError>;
}

pub struct StudyAids {
    store: Arc<dyn StudyAidStore>,
    generator: Arc<dyn StudyAidGenerator>,
    chunks: Arc<dyn ChunkSource>,
}

impl StudyAids {
    pub fn new(
        store: Arc<dyn StudyAidStore>,
        generator: Arc<dyn StudyAidGenerator>,
        chunks: Arc<dyn ChunkSource>,
    ) -> Self {
        Self {
            store,
            generator,
            chunks,
        }
    }

    pub async fn lookup_summary(&self, document_id: &str) -> Result<Lookup<Summary>, StudyAidError> {
        match self.store.fetch_summary(document_id).await {
            Ok(summary) => Ok(Lookup::Found(summary)),
            Err(SupabaseError::NotFound(_)) => Ok(Lookup::Missing),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn generate_summary(
        &self,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<Summary, StudyAidError> {
        let content = self.source_text(dataset_id, document_id).await?;
        let summary = self.generator.summarize(&content).await?;

        // Nothing is written unless generation succeeded
        self.store.insert_summary(document_id, &summary).await?;
        info!("Stored summary for document {}", document_id);

        Ok(Summary {
            document_id: document_id.to_string(),
            summary,
        })
    }

    pub async fn lookup_quiz(&self, document_id: &str) -> Result<Lookup<QuizSet>, StudyAidError> {
        match self.store.fetch_quiz(document_id).await {
            Ok(quiz) => Ok(Lookup::Found(quiz)),
            Err(SupabaseError::NotFound(_)) => Ok(Lookup::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Quizzes are built from the stored summary when one exists
    pub async fn generate_quiz(
        &self,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<QuizSet, StudyAidError> {
        let content = match self.lookup_summary(document_id).await? {
            Lookup::Found(summary) if !summary.summary.trim().is_empty() => {
                debug!("Building quiz for {} from stored summary", document_id);
                summary.summary
            }
            _ => self.source_text(dataset_id, document_id).await?,
        };

        let quiz = self.generator.quiz(&content).await?;
        self.store.insert_quiz(document_id, &quiz).await?;
        info!("Stored {} quiz questions for document {}", quiz.questions.len(), document_id);
        Ok(quiz)
    }

    async fn source_text(&self, dataset_id: &str, document_id: &str) -> Result<String, StudyAidError> {
        let text = self.chunks.document_text(dataset_id, document_id).await?;
        if text.trim().is_empty() {
            return Err(StudyAidError::NoContent(document_id.to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl StudyAidStore for SupabaseClient {
    async fn fetch_summary(&self, document_id: &str) -> Result<Summary, SupabaseError> {
        SupabaseClient::fetch_summary(self, document_id).await
    }

    async fn insert_summary(&self, document_id: &str, summary: &str) -> Result<(), SupabaseError> {
        SupabaseClient::insert_summary(self, document_id, summary).await
    }

    async fn fetch_quiz(&self, document_id: &str) -> Result<QuizSet, SupabaseError> {
        SupabaseClient::fetch_quiz(self, document_id).await
    }

    async fn insert_quiz(&self, document_id: &str, quiz: &QuizSet) -> Result<(), SupabaseError> {
        SupabaseClient::insert_quiz(self, document_id, quiz).await
    }
}

#[async_trait]
impl StudyAidGenerator for CompletionClient {
    async fn summarize(&self, content: &str) -> Result<String, CompletionError> {
        self.summarize_document(content).await
    }

    async fn quiz(&self, content: &str) -> Result<QuizSet, CompletionError> {
        self.generate_quiz(content).await
    }
}

#[async_trait]
impl ChunkSource for RagClient {
    async fn document_text(&self, dataset_id: &str, document_id: &str) -> Result<String, ApiError> {
        let page = self.list_chunks(dataset_id, document_id).await?;
        Ok(join_chunks(page.chunks.iter().map(|c| c.content.as_str())))
    }
}

/// Non-blank chunk contents separated by blank lines
pub fn join_chunks<'a>(contents: impl Iterator<Item = &'a str>) -> String {
    contents
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
