/// Failure to produce a secret. Messages carry identifiers only, never values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("invalid secret id {secret_id}: {reason}")]
    InvalidId { secret_id: String, reason: String },
    #[error("provider {provider} has not cached a token yet")]
    CacheEmpty { provider: String },
    #[error(
        "cached token of provider {provider} is {age_secs}s old, past its {ttl_secs}s validity"
    )]
    Expired {
        provider: String,
        age_secs: u64,
        ttl_secs: u64,
    },
    #[error("secret provider error for {secret_id}: {message}")]
    Provider { secret_id: String, message: String },
}

impl SecretError {
    pub fn provider(secret_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            secret_id: secret_id.into(),
            message: message.into(),
        }
    }
}
