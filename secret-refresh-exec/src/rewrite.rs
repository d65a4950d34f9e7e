//! Turns an inbound request's reserved headers into a rewrite decision.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use secret_refresh_core::{
    parse_header_template, resolve_destination, ConfigError, DestinationError, HeaderSource,
    RequestConfig, TemplateError, FORWARD_TO_HEADER, HEADER_TEMPLATE_HEADER, RESERVED_HEADERS,
    SECRET_ID_HEADER, SECRET_PROVIDER_HEADER,
};
use url::Url;

use crate::registry::ProviderRegistry;
use crate::secrets::SecretError;

/// Where to send the request and which header to add. Produced whole or not at all.
#[derive(Clone)]
pub struct RewriteDecision {
    url: Url,
    header_name: HeaderName,
    header_value: HeaderValue,
}

impl RewriteDecision {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn header_key(&self) -> &HeaderName {
        &self.header_name
    }

    /// Marked sensitive so HTTP/2 encoders never index it.
    pub fn header_value(&self) -> &HeaderValue {
        &self.header_value
    }

    /// Remove the reserved headers from `headers`, then set the rendered one.
    pub fn apply(&self, headers: &mut HeaderMap) {
        strip_reserved_headers(headers);
        headers.insert(self.header_name.clone(), self.header_value.clone());
    }
}

impl std::fmt::Debug for RewriteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteDecision")
            .field("url", &self.url.as_str())
            .field("header_key", &self.header_name)
            .field("header_value", &"<redacted>")
            .finish()
    }
}

pub fn strip_reserved_headers(headers: &mut HeaderMap) {
    for name in RESERVED_HEADERS {
        headers.remove(name);
    }
}

/// Run extract, resolve, provider lookup, secret fetch and render, stopping at
/// the first failure.
pub async fn rewrite_request<H>(
    headers: &H,
    registry: &ProviderRegistry,
) -> Result<RewriteDecision, RewriteError>
where
    H: HeaderSource + ?Sized,
{
    let result = decide(headers, registry).await;
    match &result {
        Ok(decision) => tracing::debug!(
            destination = %decision.url,
            header = %decision.header_name,
            "rewrite decided"
        ),
        Err(e) => tracing::warn!(header = e.header(), error = %e, "rejecting request"),
    }
    result
}

async fn decide<H>(
    headers: &H,
    registry: &ProviderRegistry,
) -> Result<RewriteDecision, RewriteError>
where
    H: HeaderSource + ?Sized,
{
    let config = RequestConfig::from_headers(headers)?;

    let url = resolve_destination(&config.destination_url).map_err(|source| {
        RewriteError::Destination {
            url: config.destination_url.clone(),
            source,
        }
    })?;

    let provider = registry
        .get(&config.secret_provider)
        .ok_or_else(|| RewriteError::ProviderNotFound {
            provider: config.secret_provider.clone(),
        })?;

    let secret = provider
        .get(&config.secret_id)
        .await
        .map_err(|source| RewriteError::SecretFetch {
            secret_id: config.secret_id.clone(),
            source,
        })?;
    let secret_str = secret.expose_str().ok_or_else(|| RewriteError::SecretFetch {
        secret_id: config.secret_id.clone(),
        source: SecretError::provider(&config.secret_id, "secret is not valid UTF-8"),
    })?;

    let template_error = |source| RewriteError::Template {
        template: config.header_template.clone(),
        source,
    };
    let rendered = parse_header_template(&config.header_template)
        .and_then(|t| t.render(secret_str))
        .map_err(template_error)?;

    let header_name = HeaderName::from_bytes(rendered.name.as_bytes())
        .map_err(|_| template_error(TemplateError::InvalidHeaderName(rendered.name.clone())))?;
    let mut header_value = HeaderValue::from_bytes(rendered.value.as_bytes())
        .map_err(|_| template_error(TemplateError::InvalidValue))?;
    header_value.set_sensitive(true);

    Ok(RewriteDecision {
        url,
        header_name,
        header_value,
    })
}

/// Request-scoped failure, returned to the caller as a 400.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "destination {url} sent in header {header} is not valid: {source}",
        header = FORWARD_TO_HEADER
    )]
    Destination {
        url: String,
        #[source]
        source: DestinationError,
    },
    #[error(
        "provider {provider} sent in header {header} does not exist",
        header = SECRET_PROVIDER_HEADER
    )]
    ProviderNotFound { provider: String },
    #[error(
        "unable to fetch secret {secret_id} sent in header {header}: {source}",
        header = SECRET_ID_HEADER
    )]
    SecretFetch {
        secret_id: String,
        #[source]
        source: SecretError,
    },
    #[error(
        "header template {template} sent in header {header} is not valid: {source}",
        header = HEADER_TEMPLATE_HEADER
    )]
    Template {
        template: String,
        #[source]
        source: TemplateError,
    },
}

impl RewriteError {
    /// The reserved header the failure traces back to.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Config(e) => e.header(),
            Self::Destination { .. } => FORWARD_TO_HEADER,
            Self::ProviderNotFound { .. } => SECRET_PROVIDER_HEADER,
            Self::SecretFetch { .. } => SECRET_ID_HEADER,
            Self::Template { .. } => HEADER_TEMPLATE_HEADER,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_strips_reserved_and_sets_header() {
        let decision = RewriteDecision {
            url: Url::parse("https://api.example.com/v1").unwrap(),
            header_name: HeaderName::from_static("authorization"),
            header_value: HeaderValue::from_static("Bearer tok"),
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-secret-forward-to", HeaderValue::from_static("https://a"));
        headers.insert("x-secret-provider", HeaderValue::from_static("p"));
        headers.insert("x-secret-id", HeaderValue::from_static("s"));
        headers.insert("x-secret-header", HeaderValue::from_static("A: {secret}"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        decision.apply(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["authorization"], "Bearer tok");
        assert_eq!(headers["accept"], "*/*");
    }

    #[test]
    fn debug_hides_header_value() {
        let decision = RewriteDecision {
            url: Url::parse("https://api.example.com/").unwrap(),
            header_name: HeaderName::from_static("authorization"),
            header_value: HeaderValue::from_static("Bearer hunter2"),
        };
        assert!(!format!("{decision:?}").contains("hunter2"));
    }

    #[test]
    fn provider_not_found_names_provider_and_header() {
        let err = RewriteError::ProviderNotFound {
            provider: "unknown".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown"));
        assert!(msg.contains(SECRET_PROVIDER_HEADER));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json()["error"], msg);
    }
}
