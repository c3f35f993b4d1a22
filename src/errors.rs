use thiserror::Error;

/// Separator the backend uses to smuggle the unparsed AI output inside an error detail
pub const RAW_RESPONSE_SENTINEL: &str = "|RAW_RESPONSE:";

pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your Spotify session has expired. Please reconnect your account.";
const DEFAULT_GENERATE_DETAIL: &str = "Failed to generate playlist";
const DEFAULT_COMMIT_DETAIL: &str = "Failed to create playlist";
const TOKEN_EXPIRED_MARKER: &str = "token expired";

/// Everything a generation attempt or a commit can fail with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error("a playlist generation is already in progress")]
    AttemptInFlight,

    #[error("playlist generation was abandoned")]
    Abandoned,

    #[error("stream transport failed: {0}")]
    StreamTransport(String),

    #[error("stream reported an error: {0}")]
    StreamDomain(String),

    #[error("{0}")]
    FallbackTransport(String),

    #[error("{message}")]
    FallbackDomain {
        message: String,
        raw_response: Option<String>,
    },

    #[error("{0}")]
    CredentialExpired(String),

    #[error("{0}")]
    Commit(String),
}

impl GenerationError {
    /// Raw AI output attached to a parse failure, if the backend sent one
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            GenerationError::FallbackDomain { raw_response, .. } => raw_response.as_deref(),
            _ => None,
        }
    }

    pub fn is_credential_expired(&self) -> bool {
        matches!(self, GenerationError::CredentialExpired(_))
    }
}

/// Errors raised by the HTTP layer before any classification
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {code}")]
    Status { code: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

/// An error detail split into its user message and optional raw diagnostic payload.
///
/// The wire form is `"<message>|RAW_RESPONSE:<raw text>"`. Only the first sentinel splits;
/// anything after it, including further sentinels, belongs to the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub raw_response: Option<String>,
}

impl ErrorDetail {
    pub fn parse(detail: &str) -> Self {
        match detail.split_once(RAW_RESPONSE_SENTINEL) {
            Some((message, raw)) => ErrorDetail {
                message: message.to_string(),
                raw_response: Some(raw.to_string()),
            },
            None => ErrorDetail {
                message: detail.to_string(),
                raw_response: None,
            },
        }
    }
}

/// Pull the `detail` string out of an error body. Non-JSON bodies are taken verbatim.
pub fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()), // validation errors arrive as a list
        },
        Ok(serde_json::Value::String(detail)) => Some(detail),
        _ => Some(trimmed.to_string()),
    }
}

fn mentions_expired_token(detail: &str) -> bool {
    detail.contains(TOKEN_EXPIRED_MARKER)
}

/// Map a failed one-shot generation call onto a user-facing error
pub fn classify_fallback_failure(error: BackendError) -> GenerationError {
    match error {
        BackendError::Transport(reason) | BackendError::Decode(reason) => {
            GenerationError::FallbackTransport(format!("{DEFAULT_GENERATE_DETAIL}: {reason}"))
        }
        BackendError::Status { code, body } => {
            let detail =
                extract_detail(&body).unwrap_or_else(|| DEFAULT_GENERATE_DETAIL.to_string());

            // the raw AI text after the sentinel is opaque and never inspected
            let parsed = ErrorDetail::parse(&detail);
            if parsed.raw_response.is_some() {
                return GenerationError::FallbackDomain {
                    message: parsed.message,
                    raw_response: parsed.raw_response,
                };
            }

            if code == 401 || mentions_expired_token(&parsed.message) {
                return GenerationError::CredentialExpired(SESSION_EXPIRED_MESSAGE.to_string());
            }

            let message = if detail.contains("Failed to generate") {
                "Unable to generate playlist suggestions. Please try a different description or try again later."
                    .to_string()
            } else if detail.contains("Failed to search Spotify") {
                "Unable to search Spotify for tracks. Please check your connection and try again."
                    .to_string()
            } else {
                detail
            };

            GenerationError::FallbackDomain {
                message,
                raw_response: None,
            }
        }
    }
}

/// Map a failed create-playlist call onto a user-facing error
pub fn classify_commit_failure(error: BackendError) -> GenerationError {
    match error {
        BackendError::Status { code, body } => {
            let detail = extract_detail(&body);
            let expired = code == 401
                || detail.as_deref().is_some_and(mentions_expired_token);
            if expired {
                GenerationError::CredentialExpired(SESSION_EXPIRED_MESSAGE.to_string())
            } else {
                GenerationError::Commit(detail.unwrap_or_else(|| DEFAULT_COMMIT_DETAIL.to_string()))
            }
        }
        BackendError::Transport(reason) | BackendError::Decode(reason) => {
            if mentions_expired_token(&reason) {
                GenerationError::CredentialExpired(SESSION_EXPIRED_MESSAGE.to_string())
            } else {
                GenerationError::Commit(format!("{DEFAULT_COMMIT_DETAIL}: {reason}"))
            }
        }
    }
}
