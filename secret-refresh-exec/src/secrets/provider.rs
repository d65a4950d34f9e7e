use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::secrets::{SecretError, SecretValue};

/// Capability shared by every credential provider.
///
/// Implementations must tolerate concurrent calls, including while their own
/// background refresh (if any) is running. Single-secret providers may ignore
/// `secret_id`.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get(&self, secret_id: &str) -> Result<SecretValue, SecretError>;
}

/// Fixed in-memory secrets, mostly for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretsProvider {
    secrets: BTreeMap<String, SecretValue>,
}

impl StaticSecretsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets
            .insert(secret_id.into(), SecretValue::from_string(value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretsProvider for StaticSecretsProvider {
    async fn get(&self, secret_id: &str) -> Result<SecretValue, SecretError> {
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvSecretsProvider {
    /// Optional prefix to apply to env var lookups.
    pub env_prefix: Option<String>,
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn get(&self, secret_id: &str) -> Result<SecretValue, SecretError> {
        let key = match &self.env_prefix {
            None => secret_id.to_string(),
            Some(p) => format!("{p}{secret_id}"),
        };
        match std::env::var(&key) {
            Ok(v) => Ok(SecretValue::from_string(v)),
            Err(std::env::VarError::NotPresent) => {
                Err(SecretError::NotFound(secret_id.to_string()))
            }
            Err(e) => Err(SecretError::provider(secret_id, e.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileSecretsProvider {
    /// base directory; secret id becomes a relative path under this directory.
    pub base_dir: PathBuf,
}

impl FileSecretsProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    async fn get(&self, secret_id: &str) -> Result<SecretValue, SecretError> {
        let relative = Path::new(secret_id);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(SecretError::InvalidId {
                secret_id: secret_id.to_string(),
                reason: "must be a relative path without '..'".to_string(),
            });
        }

        let path = self.base_dir.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(SecretValue::from_bytes(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(secret_id.to_string()))
            }
            Err(e) => Err(SecretError::provider(secret_id, e.to_string())),
        }
    }
}
