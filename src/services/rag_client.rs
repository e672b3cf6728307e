//! Typed client for the document/RAG backend's `/api/v1` surface.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::dto::{
    reference_chunks, ChunkPage, CompletionData, CompletionRequest, CreateSessionRequest,
    DocumentPage, ListParams, RelatedQuestionsRequest, RenameSessionRequest, SessionDto,
};
use crate::api::envelope::{decode_envelope, ApiError, ApiOutcome};
use crate::config::Config;
use crate::models::internal::{
    ChatAssistant, ChatMessage, ChatSession, Dataset, ReferenceChunk,
};
use crate::services::resource_fetcher::auth_headers;

const ASSISTANT_PAGE_SIZE: u32 = 100;
// Bounds the walk when a backend ignores `page`
const MAX_ASSISTANT_PAGES: u32 = 50;

/// Answer to one chat question
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionAnswer {
    pub answer: String,
    pub session_id: Option<String>,
    pub references: Vec<ReferenceChunk>,
}

#[derive(Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
    default_user_id: String,
}

impl std::fmt::Debug for RagClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RagClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let headers =
            auth_headers(config).map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.api_base().to_string(),
            default_user_id: config.user_id.clone(),
        })
    }

    pub fn default_user_id(&self) -> &str {
        &self.default_user_id
    }

    pub async fn list_datasets(&self, params: &ListParams) -> Result<Vec<Dataset>, ApiError> {
        let url = format!("{}/api/v1/datasets", self.base_url);
        let outcome: ApiOutcome<Option<Vec<Dataset>>> =
            self.get_envelope(&url, &params.to_query()).await?;
        Ok(outcome.into_listing("dataset"))
    }

    pub async fn list_documents(
        &self,
        dataset_id: &str,
        params: &ListParams,
    ) -> Result<DocumentPage, ApiError> {
        if dataset_id.is_empty() {
            return Err(ApiError::InvalidArgument("datasetId is required".to_string()));
        }
        let url = format!("{}/api/v1/datasets/{}/documents", self.base_url, dataset_id);
        let outcome: ApiOutcome<Option<DocumentPage>> =
            self.get_envelope(&url, &params.to_query()).await?;
        Ok(outcome.into_listing("document"))
    }

    pub async fn list_chunks(
        &self,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<ChunkPage, ApiError> {
        if dataset_id.is_empty() || document_id.is_empty() {
            return Err(ApiError::InvalidArgument(
                "datasetId and documentId are required".to_string(),
            ));
        }
        let url = format!(
            "{}/api/v1/datasets/{}/documents/{}/chunks",
            self.base_url, dataset_id, document_id
        );
        let outcome: ApiOutcome<ChunkPage> = self.get_envelope(&url, &[]).await?;
        outcome.into_result("Failed to fetch document chunks")
    }

    pub async fn list_chat_assistants(
        &self,
        params: &ListParams,
    ) -> Result<Vec<ChatAssistant>, ApiError> {
        let url = format!("{}/api/v1/chats", self.base_url);
        let outcome: ApiOutcome<Option<Vec<ChatAssistant>>> =
            self.get_envelope(&url, &params.to_query()).await?;
        Ok(outcome.into_listing("chat assistant"))
    }

    /// Assistant serving a book, or `None` when chat is unavailable for it
    pub async fn find_assistant_for(
        &self,
        book_name: &str,
    ) -> Result<Option<ChatAssistant>, ApiError> {
        let assistants = self.list_every_assistant().await?;
        Ok(match_assistant(&assistants, book_name).cloned())
    }

    /// Walks `/api/v1/chats` page by page until a short page comes back
    async fn list_every_assistant(&self) -> Result<Vec<ChatAssistant>, ApiError> {
        let mut params = ListParams {
            page_size: ASSISTANT_PAGE_SIZE,
            ..ListParams::default()
        };
        let mut all = Vec::new();

        for _ in 0..MAX_ASSISTANT_PAGES {
            let page = self.list_chat_assistants(&params).await?;
            let fetched = page.len();
            all.extend(page);
            if fetched < ASSISTANT_PAGE_SIZE as usize {
                return Ok(all);
            }
            params.page += 1;
        }

        warn!(
            "Stopped listing chat assistants after {} pages",
            MAX_ASSISTANT_PAGES
        );
        Ok(all)
    }

    pub async fn create_session(
        &self,
        chat_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<SessionDto, ApiError> {
        let url = format!("{}/api/v1/chats/{}/sessions", self.base_url, chat_id);
        let body = CreateSessionRequest { name, user_id };
        let outcome: ApiOutcome<Option<SessionDto>> =
            self.send_envelope(reqwest::Method::POST, &url, &body).await?;

        outcome
            .into_result("Failed to create chat session")?
            .ok_or_else(|| ApiError::Server {
                code: 0,
                message: "Failed to create chat session".to_string(),
            })
    }

    pub async fn rename_session(
        &self,
        chat_id: &str,
        session_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{}/api/v1/chats/{}/sessions/{}",
            self.base_url, chat_id, session_id
        );
        let body = RenameSessionRequest { name, user_id };
        let outcome: ApiOutcome<Value> =
            self.send_envelope(reqwest::Method::PUT, &url, &body).await?;
        outcome.into_result("Failed to rename chat session")?;
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> Result<Vec<SessionDto>, ApiError> {
        let url = format!("{}/api/v1/chats/{}/sessions", self.base_url, chat_id);
        let query = [("user_id", user_id.to_string())];
        let outcome: ApiOutcome<Option<Vec<SessionDto>>> = self.get_envelope(&url, &query).await?;
        Ok(outcome.into_listing("session"))
    }

    /// Sessions across every assistant, newest first.
    ///
    /// An assistant whose session listing fails is skipped.
    pub async fn list_all_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, ApiError> {
        let assistants = self.list_every_assistant().await?;
        let mut all = Vec::new();

        for assistant in &assistants {
            match self.list_sessions(&assistant.id, user_id).await {
                Ok(sessions) => all.extend(
                    sessions
                        .into_iter()
                        .map(|s| session_from_dto(s, Some(assistant))),
                ),
                Err(e) => warn!("Failed to load sessions for {}: {}", assistant.name, e),
            }
        }

        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    pub async fn send_completion(
        &self,
        chat_id: &str,
        question: &str,
        session_id: Option<&str>,
        user_id: &str,
    ) -> Result<CompletionAnswer, ApiError> {
        let url = format!("{}/api/v1/chats/{}/completions", self.base_url, chat_id);
        let body = CompletionRequest {
            question,
            stream: false,
            session_id,
            user_id,
        };
        let outcome: ApiOutcome<Value> =
            self.send_envelope(reqwest::Method::POST, &url, &body).await?;
        let data = unwrap_completion(outcome.into_result("Failed to get chat response")?)?;

        Ok(CompletionAnswer {
            references: reference_chunks(&data.reference),
            answer: data.answer,
            session_id: data.session_id,
        })
    }

    pub async fn related_questions(&self, question: &str) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/api/v1/sessions/related_questions", self.base_url);
        let body = RelatedQuestionsRequest { question };
        let outcome: ApiOutcome<Option<Vec<String>>> =
            self.send_envelope(reqwest::Method::POST, &url, &body).await?;
        Ok(outcome
            .into_result("Failed to fetch related questions")?
            .unwrap_or_default())
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<ApiOutcome<T>, ApiError> {
        debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        Self::read_envelope(response).await
    }

    async fn send_envelope<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<ApiOutcome<T>, ApiError> {
        debug!("{} {}", method, url);
        let response = self.client.request(method, url).json(body).send().await?;
        Self::read_envelope(response).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiOutcome<T>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let bytes = response.bytes().await?;
        decode_envelope(&bytes)
    }
}

/// Exact `"<book> Assistant"` wins; otherwise the first name containing the book name
pub fn match_assistant<'a>(
    assistants: &'a [ChatAssistant],
    book_name: &str,
) -> Option<&'a ChatAssistant> {
    if book_name.is_empty() {
        return None;
    }
    let exact = format!("{} Assistant", book_name);
    assistants
        .iter()
        .find(|a| a.name == exact)
        .or_else(|| assistants.iter().find(|a| a.name.contains(book_name)))
}

/// Accepts both an already-structured `data` object and the
/// `data:{...}` string the backend emits from its streaming code path.
pub fn unwrap_completion(data: Value) -> Result<CompletionData, ApiError> {
    match data {
        Value::Object(_) => serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("completion: {}", e))),
        Value::String(raw) => {
            let inner = parse_event_payload(&raw)?;
            if inner.get("code").is_some() {
                let bytes = serde_json::to_vec(&inner)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
                let outcome: ApiOutcome<CompletionData> = decode_envelope(&bytes)?;
                outcome.into_result("Failed to get chat response")
            } else {
                serde_json::from_value(inner)
                    .map_err(|e| ApiError::InvalidResponse(format!("completion: {}", e)))
            }
        }
        other => Err(ApiError::InvalidResponse(format!(
            "unexpected completion payload: {}",
            other
        ))),
    }
}

fn parse_event_payload(raw: &str) -> Result<Value, ApiError> {
    let strip = |s: &str| s.trim().strip_prefix("data:").unwrap_or(s.trim()).trim().to_string();

    if let Ok(value) = serde_json::from_str::<Value>(&strip(raw)) {
        return Ok(value);
    }
    // Several events in one string: the first one carries the answer
    raw.lines()
        .map(strip)
        .find(|line| !line.is_empty())
        .and_then(|line| serde_json::from_str(&line).ok())
        .ok_or_else(|| ApiError::InvalidResponse("unparseable completion payload".to_string()))
}

pub(crate) fn millis_to_datetime(ms: Option<i64>) -> DateTime<Utc> {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// Server session with messages given collision-free local ids
pub fn session_from_dto(dto: SessionDto, assistant: Option<&ChatAssistant>) -> ChatSession {
    let timestamp = millis_to_datetime(dto.update_time);
    let messages: Vec<ChatMessage> = dto
        .messages
        .iter()
        .enumerate()
        .map(|(idx, m)| ChatMessage {
            id: format!(
                "session-{}-msg-{}-{}",
                dto.id,
                idx,
                m.id.clone()
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
            ),
            content: m.content.clone(),
            is_user: m.role == "user",
            timestamp,
            references: reference_chunks(&m.reference),
        })
        .collect();

    ChatSession {
        last_message: ChatSession::derive_last_message(&messages),
        chat_id: dto.chat_id.or_else(|| assistant.map(|a| a.id.clone())),
        assistant_name: assistant.map(|a| a.name.clone()),
        id: dto.id,
        name: dto.name,
        updated_at: dto.update_time.unwrap_or_default(),
        messages,
    }
}
