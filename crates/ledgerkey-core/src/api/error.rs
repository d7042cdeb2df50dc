use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    /// The service has provisioned the first administrator account and
    /// returned its generated credentials.
    #[error("First admin login: {credentials}")]
    FirstAdminLogin { credentials: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// gRPC status code the gateway uses for unauthenticated calls.
const CODE_UNAUTHENTICATED: i32 = 16;

/// Machine-readable reasons attached to gateway error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    FirstAdminLogin,
    #[serde(other)]
    Other,
}

/// Error body returned by the service gateway on non-success responses.
#[derive(Debug, serde::Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<ErrorReason>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a failed response by its structured error body first,
    /// falling back to the HTTP status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
            if parsed.reason == Some(ErrorReason::FirstAdminLogin) {
                return ApiError::FirstAdminLogin {
                    credentials: parsed.message,
                };
            }
            if parsed.code == CODE_UNAUTHENTICATED {
                return ApiError::Unauthenticated;
            }
        }

        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthenticated,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}
