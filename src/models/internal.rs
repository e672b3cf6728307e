use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of documents (a "book" in the reader UI)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub document_count: u64,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParserConfig {
    #[serde(default)]
    pub chunk_token_count: Option<u32>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub layout_recognize: Option<serde_json::Value>,
    #[serde(default)]
    pub task_page_size: Option<u32>,
}

/// A single processed file inside a dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(alias = "knowledgebase_id", default)]
    pub dataset_id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub token_count: u64,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub progress_msg: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub parser_config: ParserConfig,
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// An AI agent bound to one or more datasets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatAssistant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub datasets: Vec<DatasetRef>,
}

/// Citation back to the source content behind an answer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferenceChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub vector_similarity: Option<f64>,
    #[serde(default)]
    pub term_similarity: Option<f64>,
    #[serde(default)]
    pub positions: Option<serde_json::Value>,
}

/// Extracted segment of a document, as listed by the chunk endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub important_keywords: Vec<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub references: Vec<ReferenceChunk>,
}

/// Conversation thread with one assistant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub chat_id: Option<String>,
    pub assistant_name: Option<String>,
    pub name: String,
    /// Milliseconds since epoch, from the server's `update_time`
    pub updated_at: i64,
    pub messages: Vec<ChatMessage>,
    pub last_message: String,
}

pub const NO_MESSAGE_PREVIEW: &str = "No message yet";

impl ChatSession {
    /// Preview text shown in the history list
    pub fn derive_last_message(messages: &[ChatMessage]) -> String {
        messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| NO_MESSAGE_PREVIEW.to_string())
    }
}

/// Filter history by preview text, case-insensitively
pub fn search_sessions<'a>(sessions: &'a [ChatSession], query: &str) -> Vec<&'a ChatSession> {
    let needle = query.to_lowercase();
    sessions
        .iter()
        .filter(|s| s.last_message.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub document_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: i64,
}

pub const QUIZ_QUESTION_COUNT: usize = 5;
pub const QUIZ_OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSet {
    pub questions: Vec<QuizQuestion>,
}

impl QuizSet {
    /// Checks the shape the quiz screen depends on
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.questions.len() != QUIZ_QUESTION_COUNT {
            return Err(format!(
                "expected {} questions, got {}",
                QUIZ_QUESTION_COUNT,
                self.questions.len()
            ));
        }
        for (idx, q) in self.questions.iter().enumerate() {
            if q.options.len() != QUIZ_OPTION_COUNT {
                return Err(format!(
                    "question {} has {} options, expected {}",
                    idx + 1,
                    q.options.len(),
                    QUIZ_OPTION_COUNT
                ));
            }
            if !(0..QUIZ_OPTION_COUNT as i64).contains(&q.correct_answer) {
                return Err(format!(
                    "question {} has correctAnswer {} out of range",
                    idx + 1,
                    q.correct_answer
                ));
            }
        }
        Ok(())
    }

    /// Number of answers that hit the correct option
    pub fn score(&self, answers: &[Option<usize>]) -> usize {
        self.questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| a.map(|a| a as i64) == Some(q.correct_answer))
            .count()
    }
}
