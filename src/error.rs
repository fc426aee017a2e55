use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum JambleError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("OAuth flow error: {0}")]
    OauthFlow(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("token signing error: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl JambleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for JambleError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => JambleError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                JambleError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => JambleError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => JambleError::Oauth2Token(s),
        }
    }
}

impl JambleError {
    /// Status, machine-readable code and client-facing message.
    ///
    /// Internal details are logged here and replaced by a generic message.
    pub fn into_parts(self) -> (StatusCode, &'static str, String) {
        let detail = self.to_string();
        match self {
            JambleError::Validation(msg) | JambleError::OauthFlow(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            JambleError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            JambleError::Oauth2Server { error } => {
                tracing::warn!(error = %error, "Spotify rejected the token request");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Spotify authorization was rejected.".to_string(),
                )
            }
            JambleError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            JambleError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", capitalize(what)),
            ),
            JambleError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            JambleError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "Request body is too large.".to_string(),
            ),
            JambleError::Oauth2Token(_) | JambleError::Reqwest(_) => {
                error!(error = %detail, "Spotify request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Spotify is unavailable.".to_string(),
                )
            }
            JambleError::UpstreamStatus(code) => {
                let (status, err_code, msg) = match code {
                    StatusCode::TOO_MANY_REQUESTS => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "RATE_LIMIT",
                        "Spotify rate limit exceeded.",
                    ),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => (
                        StatusCode::UNAUTHORIZED,
                        "UNAUTHORIZED",
                        "Spotify authentication failed; sign in with Spotify again.",
                    ),
                    _ => (
                        StatusCode::BAD_GATEWAY,
                        "UPSTREAM_ERROR",
                        "An upstream error occurred.",
                    ),
                };
                (status, err_code, msg.to_string())
            }
            JambleError::UrlParse(_)
            | JambleError::Json(_)
            | JambleError::Database(_)
            | JambleError::PasswordHash(_)
            | JambleError::TokenSigning(_)
            | JambleError::Join(_)
            | JambleError::Config(_)
            | JambleError::CorruptRecord(_) => {
                error!(error = %detail, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for JambleError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = self.into_parts();
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
