use std::time::Duration;

use async_trait::async_trait;

use crate::secrets::SecretValue;

/// What a minted token grants access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTarget {
    pub region: String,
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl TokenTarget {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client of the external identity service that signs database auth tokens.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    async fn mint(&self, target: &TokenTarget, ttl: Duration) -> Result<SecretValue, MintError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MintError {
    #[error("identity service configuration error: {0}")]
    Config(String),
    #[error("identity service error: {0}")]
    Identity(String),
}
