use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::rewrite::RewriteError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error("request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    ReadBody(String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(std::time::Duration),
    #[error("failed to build response: {0}")]
    Response(String),
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rewrite(e) => e.status(),
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ReadBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Response(_) | Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "proxy error");
        }
        let body = match &self {
            Self::Rewrite(e) => e.to_json(),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
