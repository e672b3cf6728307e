use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::internal::{Document, DocumentChunk, ReferenceChunk};

// ==================== REQUEST DTOs ====================

/// Pagination, sorting and filters shared by every listing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    pub order_by: String,
    pub desc: bool,
    pub name: Option<String>,
    pub id: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            order_by: "create_time".to_string(),
            desc: true,
            name: None,
            id: None,
        }
    }
}

impl ListParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Query pairs in the order the backend documents them
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
            ("orderby", self.order_by.clone()),
            ("desc", self.desc.to_string()),
        ];
        if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
            query.push(("name", name.clone()));
        }
        if let Some(id) = self.id.as_ref().filter(|i| !i.is_empty()) {
            query.push(("id", id.clone()));
        }
        query
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub name: &'a str,
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RenameSessionRequest<'a> {
    pub name: &'a str,
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub question: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RelatedQuestionsRequest<'a> {
    pub question: &'a str,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Default, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub docs: Vec<Document>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChunkPage {
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
    #[serde(default)]
    pub doc: Option<Value>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionMessageDto {
    #[serde(default)]
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub reference: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionDto {
    pub id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default)]
    pub messages: Vec<SessionMessageDto>,
}

/// Inner payload of a completion answer
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionData {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub reference: Value,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Reference chunks from either `{"chunks": [...]}` or a bare list.
/// Anything else (the backend sends `{}` before retrieval runs) has none.
pub fn reference_chunks(reference: &Value) -> Vec<ReferenceChunk> {
    let list = match reference {
        Value::Object(map) => map.get("chunks").cloned().unwrap_or(Value::Null),
        Value::Array(_) => reference.clone(),
        _ => Value::Null,
    };
    match list {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
