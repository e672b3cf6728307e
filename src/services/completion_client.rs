use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::internal::{QuizSet, QUIZ_OPTION_COUNT, QUIZ_QUESTION_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("No content generated")]
    Empty,
    #[error("Invalid quiz: {0}")]
    InvalidQuiz(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// OpenAI-compatible chat completion client (OpenRouter by default)
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &Config) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.completion_api_key))
            .map_err(|e| CompletionError::InvalidHeader(e.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        // Attribution headers are optional
        if let Some(site) = config.site_url.as_deref().and_then(|s| HeaderValue::from_str(s).ok()) {
            headers.insert("http-referer", site);
        }
        if let Some(name) = config.site_name.as_deref().and_then(|s| HeaderValue::from_str(s).ok()) {
            headers.insert("x-title", name);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: config.completion_base_url.trim_end_matches('/').to_string(),
            model: config.completion_model.clone(),
        })
    }

    /// Summary in Bahasa Indonesia, without preamble
    pub async fn summarize_document(&self, content: &str) -> Result<String, CompletionError> {
        let prompt = format!(
            "Summarize the following document in Bahasa Indonesia. Provide only the summary content directly, without any introductory sentences or explanations:\n\n{}",
            content
        );
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatTurn::user(prompt)],
            temperature: None,
            response_format: None,
        };
        self.complete(&request).await
    }

    /// Two to four word title for a session; falls back to the message itself
    pub async fn generate_session_title(&self, user_message: &str) -> String {
        match self.try_session_title(user_message).await {
            Ok(title) => title,
            Err(e) => {
                warn!("Error generating session name: {}", e);
                user_message.to_string()
            }
        }
    }

    async fn try_session_title(&self, user_message: &str) -> Result<String, CompletionError> {
        let system = "You are a session name generator. Your ONLY job is to create short, descriptive session names in Bahasa Indonesia. You must respond with ONLY the session name - no explanations, no reasoning, no additional text.";
        let user = format!(
            "Create a concise session name (2-4 words) in Bahasa Indonesia for this question:\n\n\"{}\"\n\nExamples:\n- \"Apa itu Pancasila?\" → Pengertian Pancasila\n- \"Bagaimana cara belajar matematika?\" → Tips Belajar Matematika\n- \"Jelaskan tentang fotosintesis\" → Materi Fotosintesis\n- \"Sebutkan sila-sila Pancasila\" → Sila-sila Pancasila\n\nRespond with ONLY the session name:",
            user_message
        );
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatTurn::system(system.to_string()), ChatTurn::user(user)],
            temperature: Some(0.1),
            response_format: None,
        };
        self.complete(&request).await
    }

    /// Five multiple-choice questions, schema-constrained and shape-checked
    pub async fn generate_quiz(&self, content: &str) -> Result<QuizSet, CompletionError> {
        let prompt = format!(
            "Buat {} soal pilihan ganda dalam Bahasa Indonesia berdasarkan materi berikut. Setiap soal harus memiliki tepat {} pilihan jawaban dan satu jawaban benar (correctAnswer adalah indeks 0-{}).\n\n{}",
            QUIZ_QUESTION_COUNT,
            QUIZ_OPTION_COUNT,
            QUIZ_OPTION_COUNT - 1,
            content
        );
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatTurn::user(prompt)],
            temperature: None,
            response_format: Some(quiz_response_format()),
        };
        let raw = self.complete(&request).await?;
        parse_quiz(&raw)
    }

    async fn complete(&self, request: &ChatCompletionRequest<'_>) -> Result<String, CompletionError> {
        debug!("Requesting completion from {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CompletionError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::Empty)
    }
}

/// `response_format` asking for exactly five four-option questions
pub fn quiz_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "quiz_questions",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "questions": {
                        "type": "array",
                        "minItems": QUIZ_QUESTION_COUNT,
                        "maxItems": QUIZ_QUESTION_COUNT,
                        "items": {
                            "type": "object",
                            "properties": {
                                "question": { "type": "string" },
                                "options": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "minItems": QUIZ_OPTION_COUNT,
                                    "maxItems": QUIZ_OPTION_COUNT
                                },
                                "correctAnswer": {
                                    "type": "integer",
                                    "minimum": 0,
                                    "maximum": QUIZ_OPTION_COUNT - 1
                                }
                            },
                            "required": ["question", "options", "correctAnswer"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["questions"],
                "additionalProperties": false
            }
        }
    })
}

/// Parses model output into a quiz, rejecting anything off-shape.
///
/// Some providers wrap JSON in a markdown fence even in schema mode.
pub fn parse_quiz(raw: &str) -> Result<QuizSet, CompletionError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let quiz: QuizSet =
        serde_json::from_str(body).map_err(|e| CompletionError::InvalidQuiz(e.to_string()))?;
    quiz.validate_shape().map_err(CompletionError::InvalidQuiz)?;
    Ok(quiz)
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatTurn {
    role: &'static str,
    content: String,
}

impl ChatTurn {
    fn system(content: String) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
