use serde_json::Value;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Request failed";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session expired or missing, please log in again")]
    Unauthorized,

    #[error("not authorized: {detail}")]
    Forbidden { detail: String },

    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },

    #[error("invalid API base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Short text for a notice: the server's detail where there is one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Forbidden { detail } | ApiError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Pulls the human readable reason out of an error body.
///
/// FastAPI style `{"detail": "..."}` first, then validation lists
/// (`{"detail": [{"msg": ...}]}`), then a plain `message` field.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

pub fn error_for_status(status: u16, body: &str) -> ApiError {
    let detail = extract_detail(body).unwrap_or_else(|| GENERIC_FAILURE.to_string());
    match status {
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden { detail },
        _ => ApiError::Status { status, detail },
    }
}

/// Message text of a successful body: `message` if JSON, the raw text otherwise.
pub fn message_from_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string()),
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { message: String },
    AlreadyImported { message: String },
}

impl ImportOutcome {
    pub fn message(&self) -> &str {
        match self {
            ImportOutcome::Imported { message } | ImportOutcome::AlreadyImported { message } => {
                message
            }
        }
    }
}

fn mentions_already_imported(message: &str) -> bool {
    message.to_lowercase().contains("already imported")
}

/// Sorts an `/import-data` response into success, the soft "already
/// imported" case, or a real failure.
pub fn classify_import(status: u16, body: &str) -> Result<ImportOutcome, ApiError> {
    let message = extract_detail(body).unwrap_or_else(|| message_from_body(body));
    if (200..300).contains(&status) {
        if mentions_already_imported(&message) {
            return Ok(ImportOutcome::AlreadyImported { message });
        }
        return Ok(ImportOutcome::Imported { message });
    }
    if (400..500).contains(&status) && mentions_already_imported(&message) {
        return Ok(ImportOutcome::AlreadyImported { message });
    }
    Err(error_for_status(status, body))
}
