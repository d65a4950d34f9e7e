//! Axum reverse proxy that applies a [`RewriteDecision`](crate::rewrite::RewriteDecision)
//! to every inbound request and streams the upstream response back.

mod error;

pub use error::ProxyError;

use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use secret_refresh_core::forward_url;
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

use crate::registry::ProviderRegistry;
use crate::rewrite::rewrite_request;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

/// Connection-scoped headers that never cross the proxy.
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub upstream_timeout: Duration,
    pub max_request_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct ProxyState {
    registry: ProviderRegistry,
    client: reqwest::Client,
    config: ProxyConfig,
}

impl ProxyState {
    pub fn new(registry: ProviderRegistry, config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("secret-refresh/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;
        Ok(Self {
            registry,
            client,
            config,
        })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

/// Every path and method goes through the same handler.
pub fn router(state: ProxyState) -> Router {
    let limit = state.config.max_request_bytes;
    Router::new()
        .fallback(handle_request)
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Serve `router(state)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ProxyState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_request(
    State(state): State<ProxyState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProxyError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("proxy_request", %request_id, %method, path = %uri.path());
    forward(state, method, uri, headers, body)
        .instrument(span)
        .await
}

async fn forward(
    state: ProxyState,
    method: Method,
    uri: Uri,
    mut headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProxyError> {
    let decision = rewrite_request(&headers, &state.registry).await?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::BodyTooLarge {
                limit: state.config.max_request_bytes,
            }
        } else {
            ProxyError::ReadBody(rejection.body_text())
        }
    })?;

    let target = forward_url(decision.url(), uri.path(), uri.query());
    strip_hop_by_hop(&mut headers);
    headers.remove(axum::http::header::HOST);
    headers.remove(axum::http::header::CONTENT_LENGTH);
    decision.apply(&mut headers);

    tracing::info!(destination = %target.host_str().unwrap_or_default(), "forwarding request");

    let upstream = state
        .client
        .request(method, target)
        .headers(headers)
        .body(body)
        .timeout(state.config.upstream_timeout)
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, state.config.upstream_timeout))?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);
    tracing::info!(status = status.as_u16(), "upstream responded");

    let mut response = Response::builder()
        .status(status)
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ProxyError::Response(e.to_string()))?;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Drop the fixed hop-by-hop headers plus any header named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(http::header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> ProxyError {
    if e.is_timeout() {
        return ProxyError::UpstreamTimeout(timeout);
    }
    ProxyError::Upstream(e.to_string())
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn strips_headers_named_by_connection() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive, X-Trace-Hop"));
        headers.append("connection", HeaderValue::from_static("x-other-hop"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert("x-other-hop", HeaderValue::from_static("2"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("te", HeaderValue::from_static("trailers"));
        headers.insert("authorization", HeaderValue::from_static("Bearer x"));

        strip_hop_by_hop(&mut headers);

        let left: Vec<_> = headers.keys().map(|k| k.as_str()).collect();
        assert_eq!(left, vec!["authorization"]);
    }
}
