//! PostgREST access to the `summaries` and `quiz_questions` tables.

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::AuthSession;
use crate::config::Config;
use crate::models::internal::{QuizQuestion, QuizSet, Summary};

/// PostgREST code for "single object requested, zero rows returned"
pub const PGRST_NO_ROWS: &str = "PGRST116";

pub const SUMMARIES_TABLE: &str = "summaries";
pub const QUIZ_TABLE: &str = "quiz_questions";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Supabase error {status}: {message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("No row for document {0}")]
    NotFound(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared REST handle. Clones share the signed-in session, so table calls
/// run as the user once [`crate::auth::SupabaseAuth`] has signed in.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    pub(crate) async fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().await = session;
    }

    /// Attaches `apikey` and the bearer (user token when signed in, anon key otherwise)
    pub(crate) async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub async fn fetch_summary(&self, document_id: &str) -> Result<Summary, SupabaseError> {
        #[derive(Deserialize)]
        struct Row {
            summary: String,
        }
        let row: Row = self
            .select_single(SUMMARIES_TABLE, "summary", document_id)
            .await?;
        Ok(Summary {
            document_id: document_id.to_string(),
            summary: row.summary,
        })
    }

    pub async fn insert_summary(&self, document_id: &str, summary: &str) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct Row<'a> {
            document_id: &'a str,
            summary: &'a str,
        }
        self.insert(SUMMARIES_TABLE, &[Row { document_id, summary }])
            .await
    }

    pub async fn fetch_quiz(&self, document_id: &str) -> Result<QuizSet, SupabaseError> {
        #[derive(Deserialize)]
        struct Row {
            questions: Vec<QuizQuestion>,
        }
        let row: Row = self
            .select_single(QUIZ_TABLE, "questions", document_id)
            .await?;
        let quiz = QuizSet {
            questions: row.questions,
        };
        quiz.validate_shape()
            .map_err(|e| SupabaseError::InvalidResponse(format!("stored quiz: {}", e)))?;
        Ok(quiz)
    }

    pub async fn insert_quiz(&self, document_id: &str, quiz: &QuizSet) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct Row<'a> {
            document_id: &'a str,
            questions: &'a [QuizQuestion],
        }
        self.insert(
            QUIZ_TABLE,
            &[Row {
                document_id,
                questions: &quiz.questions,
            }],
        )
        .await
    }

    async fn select_single<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        document_id: &str,
    ) -> Result<T, SupabaseError> {
        let url = self.url(&format!("/rest/v1/{}", table));
        debug!("Selecting {} for document {}", table, document_id);

        let request = self
            .client
            .get(&url)
            .query(&[
                ("select", columns.to_string()),
                ("document_id", format!("eq.{}", document_id)),
            ])
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        let response = self.authorize(request).await.send().await?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| SupabaseError::InvalidResponse(e.to_string())),
            status => {
                let err = api_error(status, response.text().await.unwrap_or_default());
                if is_not_found(&err) {
                    Err(SupabaseError::NotFound(document_id.to_string()))
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn insert<R: Serialize>(&self, table: &str, rows: &[R]) -> Result<(), SupabaseError> {
        let url = self.url(&format!("/rest/v1/{}", table));
        let request = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(rows);
        let response = self.authorize(request).await.send().await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Inserted {} row(s) into {}", rows.len(), table);
            Ok(())
        } else {
            Err(api_error(status, response.text().await.unwrap_or_default()))
        }
    }
}

/// Builds an error from any of the body shapes PostgREST and GoTrue return
pub(crate) fn api_error(status: StatusCode, body: String) -> SupabaseError {
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let (code, message) = match parsed {
        Some(b) => {
            let code = b.code.map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            });
            let message = b
                .message
                .or(b.msg)
                .or(b.error_description)
                .or(b.error)
                .unwrap_or_else(|| body.clone());
            (code, message)
        }
        None => (None, body),
    };
    SupabaseError::ApiError {
        status: status.as_u16(),
        code,
        message,
    }
}

fn is_not_found(err: &SupabaseError) -> bool {
    matches!(
        err,
        SupabaseError::ApiError { status: 406, .. }
    ) || matches!(
        err,
        SupabaseError::ApiError { code: Some(code), .. } if code == PGRST_NO_ROWS
    )
}
