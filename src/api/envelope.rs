//! Decoding of the `{code, data, message}` wrapper every RAG backend response uses.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Success code
pub const CODE_OK: i64 = 0;
/// Returned by listings when nothing matches (or the caller lacks access)
pub const CODE_EMPTY_RESULT: i64 = 102;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API request failed: {status}")]
    Status { status: u16, body: String },
    #[error("Server error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    code: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Result of one backend call, after the envelope convention is applied
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Ok { data: T },
    Err { code: i64, message: Option<String> },
}

/// Single place where the success/failure convention is interpreted.
///
/// A zero code decodes `data` into `T`; any other code becomes
/// [`ApiOutcome::Err`] carrying the server message.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<ApiOutcome<T>, ApiError> {
    let raw: RawEnvelope = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidResponse(format!("envelope: {}", e)))?;

    if raw.code != CODE_OK {
        return Ok(ApiOutcome::Err {
            code: raw.code,
            message: raw.message,
        });
    }

    let data = serde_json::from_value(raw.data)
        .map_err(|e| ApiError::InvalidResponse(format!("data: {}", e)))?;
    Ok(ApiOutcome::Ok { data })
}

impl<T> ApiOutcome<T> {
    /// Mutating and completion calls: any non-zero code is a failure
    pub fn into_result(self, fallback: &str) -> Result<T, ApiError> {
        match self {
            ApiOutcome::Ok { data } => Ok(data),
            ApiOutcome::Err { code, message } => Err(ApiError::Server {
                code,
                message: message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiOutcome::Ok { .. })
    }
}

impl<T: Default> ApiOutcome<Option<T>> {
    /// Listing calls: a non-zero code means "nothing to show", not a failure
    pub fn into_listing(self, what: &str) -> T {
        match self {
            ApiOutcome::Ok { data } => data.unwrap_or_default(),
            ApiOutcome::Err { code, message } => {
                if code == CODE_EMPTY_RESULT {
                    tracing::debug!("{} listing empty: {}", what, message.unwrap_or_default());
                } else {
                    tracing::warn!(
                        "{} listing returned code {}: {}",
                        what,
                        code,
                        message.unwrap_or_default()
                    );
                }
                T::default()
            }
        }
    }
}
