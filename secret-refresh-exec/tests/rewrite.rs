use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};

use secret_refresh_core::{
    FORWARD_TO_HEADER, HEADER_TEMPLATE_HEADER, SECRET_ID_HEADER, SECRET_PROVIDER_HEADER,
};
use secret_refresh_exec::registry::ProviderRegistry;
use secret_refresh_exec::rewrite::{rewrite_request, strip_reserved_headers, RewriteError};
use secret_refresh_exec::secrets::{
    SecretError, SecretValue, SecretsProvider, StaticSecretsProvider,
};

/// Counts calls so tests can prove the pipeline stopped before fetching.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl SecretsProvider for CountingProvider {
    async fn get(&self, _secret_id: &str) -> Result<SecretValue, SecretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SecretValue::from_string("counted".to_string()))
    }
}

fn registry() -> ProviderRegistry {
    ProviderRegistry::builder()
        .register(
            "static",
            Arc::new(StaticSecretsProvider::new().with_secret("s1", "tok123")),
        )
        .unwrap()
        .build()
}

fn counting_registry() -> (ProviderRegistry, Arc<CountingProvider>) {
    let counting = Arc::new(CountingProvider::default());
    let registry = ProviderRegistry::builder()
        .register("counting", counting.clone())
        .unwrap()
        .build();
    (registry, counting)
}

fn headers(provider: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (FORWARD_TO_HEADER.to_string(), "https://api.example.com/v1".to_string()),
        (SECRET_PROVIDER_HEADER.to_string(), provider.to_string()),
        (SECRET_ID_HEADER.to_string(), "s1".to_string()),
        (
            HEADER_TEMPLATE_HEADER.to_string(),
            "Authorization: Bearer {secret}".to_string(),
        ),
    ])
}

#[tokio::test]
async fn static_provider_produces_full_decision() {
    let decision = rewrite_request(&headers("static"), &registry()).await.unwrap();

    assert_eq!(decision.url().as_str(), "https://api.example.com/v1");
    assert_eq!(decision.header_key().as_str(), "authorization");
    assert_eq!(decision.header_value(), "Bearer tok123");
    assert!(decision.header_value().is_sensitive());
}

#[tokio::test]
async fn unknown_provider_is_named_in_error() {
    let err = rewrite_request(&headers("unknown"), &registry())
        .await
        .unwrap_err();

    assert!(matches!(&err, RewriteError::ProviderNotFound { provider } if provider == "unknown"));
    let msg = err.to_string();
    assert!(msg.contains("unknown"));
    assert!(msg.contains(SECRET_PROVIDER_HEADER));
    assert_eq!(err.header(), SECRET_PROVIDER_HEADER);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_header_never_reaches_provider() {
    let (registry, counting) = counting_registry();

    for missing in [
        FORWARD_TO_HEADER,
        SECRET_PROVIDER_HEADER,
        SECRET_ID_HEADER,
        HEADER_TEMPLATE_HEADER,
    ] {
        let mut h = headers("counting");
        h.remove(missing);
        let err = rewrite_request(&h, &registry).await.unwrap_err();
        assert!(matches!(err, RewriteError::Config(_)));
        assert_eq!(err.header(), missing);
        assert!(err.to_string().contains(missing));
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bad_destination_never_reaches_provider() {
    let (registry, counting) = counting_registry();

    for url in ["api.example.com/v1", "https://", "ftp://files.example.com/"] {
        let mut h = headers("counting");
        h.insert(FORWARD_TO_HEADER.to_string(), url.to_string());
        let err = rewrite_request(&h, &registry).await.unwrap_err();
        assert!(matches!(err, RewriteError::Destination { .. }), "{url}");
        assert_eq!(err.header(), FORWARD_TO_HEADER);
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_provider_never_reaches_other_providers() {
    let (registry, counting) = counting_registry();

    let err = rewrite_request(&headers("nope"), &registry).await.unwrap_err();
    assert!(matches!(err, RewriteError::ProviderNotFound { .. }));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_secret_is_a_fetch_error() {
    let mut h = headers("static");
    h.insert(SECRET_ID_HEADER.to_string(), "s2".to_string());

    let err = rewrite_request(&h, &registry()).await.unwrap_err();
    assert!(matches!(
        &err,
        RewriteError::SecretFetch {
            secret_id,
            source: SecretError::NotFound(_),
        } if secret_id == "s2"
    ));
    assert!(err.to_string().contains(SECRET_ID_HEADER));
}

#[tokio::test]
async fn invalid_template_is_reported_after_fetch() {
    let (registry, counting) = counting_registry();
    let mut h = headers("counting");
    h.insert(HEADER_TEMPLATE_HEADER.to_string(), "Authorization Bearer".to_string());

    let err = rewrite_request(&h, &registry).await.unwrap_err();
    assert!(matches!(err, RewriteError::Template { .. }));
    assert_eq!(err.header(), HEADER_TEMPLATE_HEADER);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn secrets_with_line_breaks_are_rejected() {
    let registry = ProviderRegistry::builder()
        .register(
            "static",
            Arc::new(StaticSecretsProvider::new().with_secret("s1", "tok\r\nX-Injected: 1")),
        )
        .unwrap()
        .build();

    let err = rewrite_request(&headers("static"), &registry).await.unwrap_err();
    assert!(matches!(err, RewriteError::Template { .. }));
    assert!(!err.to_string().contains("X-Injected"));
}

#[tokio::test]
async fn works_on_http_header_maps() {
    let mut h = HeaderMap::new();
    h.insert("x-secret-forward-to", HeaderValue::from_static("https://api.example.com"));
    h.insert("x-secret-provider", HeaderValue::from_static("static"));
    h.insert("x-secret-id", HeaderValue::from_static("s1"));
    h.insert("x-secret-header", HeaderValue::from_static("X-Api-Key: {secret}"));
    h.insert("accept", HeaderValue::from_static("application/json"));

    let decision = rewrite_request(&h, &registry()).await.unwrap();
    assert_eq!(decision.url().as_str(), "https://api.example.com/");

    decision.apply(&mut h);
    assert_eq!(h.len(), 2);
    assert_eq!(h["x-api-key"], "tok123");
    assert_eq!(h["accept"], "application/json");
}

#[test]
fn strip_removes_only_reserved_headers() {
    let mut h = HeaderMap::new();
    h.insert("x-secret-id", HeaderValue::from_static("s1"));
    h.append("x-secret-header", HeaderValue::from_static("A: {secret}"));
    h.append("x-secret-header", HeaderValue::from_static("B: {secret}"));
    h.insert("x-request-id", HeaderValue::from_static("abc"));

    strip_reserved_headers(&mut h);
    assert_eq!(h.len(), 1);
    assert!(h.contains_key("x-request-id"));
}

#[test]
fn error_body_is_json() {
    let err = RewriteError::ProviderNotFound {
        provider: "unknown".to_string(),
    };
    let body = err.to_json();
    assert_eq!(body["error"].as_str().unwrap(), err.to_string());
}
